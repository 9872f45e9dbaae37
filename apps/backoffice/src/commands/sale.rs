//! # Sale Commands
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale form (shift, customer, discount, payment, tendered, lines[])     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  create_sale ──► SaleProcessor::process_sale (one transaction)          │
//! │       │                                                                 │
//! │       ├── Ok:  SaleDto + "Sale recorded" + change due                   │
//! │       │        + one warning per product left at/below its minimum      │
//! │       │                                                                 │
//! │       └── Err: ApiError, form re-rendered; nothing was saved            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::notice::{Notice, Response};
use crate::state::AppState;
use mostrador_core::{PaymentMethod, Sale, SaleLineItem, SaleRequest};
use mostrador_db::service::checkout::SALE_LIST_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDto {
    pub line_no: i64,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<SaleLineItem> for LineItemDto {
    fn from(item: SaleLineItem) -> Self {
        LineItemDto {
            line_no: item.line_no,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            subtotal_cents: item.subtotal_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: String,
    pub shift_id: String,
    pub customer_name: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub tendered_cents: Option<i64>,
    pub change_cents: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItemDto>,
}

impl SaleDto {
    fn new(sale: Sale, items: Vec<SaleLineItem>) -> Self {
        SaleDto {
            id: sale.id,
            shift_id: sale.shift_id,
            customer_name: sale.customer_name,
            subtotal_cents: sale.subtotal_cents,
            discount_cents: sale.discount_cents,
            total_cents: sale.total_cents,
            payment_method: sale.payment_method,
            tendered_cents: sale.tendered_cents,
            change_cents: sale.change_cents,
            created_at: sale.created_at,
            items: items.into_iter().map(LineItemDto::from).collect(),
        }
    }
}

impl From<Sale> for SaleDto {
    fn from(sale: Sale) -> Self {
        SaleDto::new(sale, Vec::new())
    }
}

/// Records a sale.
pub async fn create_sale(
    state: &AppState,
    request: &SaleRequest,
) -> Result<Response<SaleDto>, ApiError> {
    debug!(
        shift_id = %request.shift_id,
        lines = request.line_items.len(),
        "create_sale command"
    );

    let completed = state.sales().process_sale(request).await?;
    let config = state.config();

    let mut notices = vec![Notice::success(format!(
        "Sale recorded: total {}",
        config.format_money(completed.sale.total_cents)
    ))];

    if completed.sale.tendered_cents.is_some() {
        notices.push(Notice::success(format!(
            "Change due: {}",
            config.format_money(completed.sale.change_cents)
        )));
    }

    for alert in completed.low_stock_alerts() {
        notices.push(Notice::warning(format!(
            "Low stock: {} has {} left (minimum {})",
            alert.name, alert.remaining, alert.stock_minimum
        )));
    }

    Ok(Response {
        data: SaleDto::new(completed.sale, completed.line_items),
        notices,
    })
}

pub async fn get_sale(state: &AppState, sale_id: &str) -> Result<SaleDto, ApiError> {
    let (sale, items) = state.sales().get_sale(sale_id).await?;
    Ok(SaleDto::new(sale, items))
}

/// Most recent sales first, without line items.
pub async fn list_sales(state: &AppState, limit: Option<u32>) -> Result<Vec<SaleDto>, ApiError> {
    let limit = limit.unwrap_or(50).min(SALE_LIST_LIMIT);
    let sales = state.sales().list_sales(limit).await?;
    Ok(sales.into_iter().map(SaleDto::from).collect())
}

/// Staff correction of a sale's customer and payment method.
pub async fn update_sale_header(
    state: &AppState,
    username: &str,
    sale_id: &str,
    customer_name: Option<&str>,
    payment_method: PaymentMethod,
) -> Result<Response<SaleDto>, ApiError> {
    debug!(username = %username, sale_id = %sale_id, "update_sale_header command");

    let actor = state.identity(username).await?.actor();
    let sale = state
        .sales()
        .update_sale_header(&actor, sale_id, customer_name, payment_method)
        .await?;

    Ok(Response::new(SaleDto::from(sale)).with(Notice::success("Sale updated")))
}

pub async fn delete_sale(
    state: &AppState,
    username: &str,
    sale_id: &str,
) -> Result<Response<()>, ApiError> {
    debug!(username = %username, sale_id = %sale_id, "delete_sale command");

    let actor = state.identity(username).await?.actor();
    state.sales().delete_sale(&actor, sale_id).await?;

    Ok(Response::new(())
        .with(Notice::success("Sale deleted"))
        .with(Notice::warning("Stock of the sold products was not restored")))
}
