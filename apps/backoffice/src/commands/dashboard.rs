//! # Dashboard Command
//!
//! Stock summary, the most critical low-stock products and the number of
//! registers currently open.

use serde::{Deserialize, Serialize};

use crate::commands::product::ProductDto;
use crate::error::ApiError;
use crate::notice::{Notice, Response};
use crate::state::AppState;
use mostrador_core::{StockSummary, CRITICAL_STOCK_LIMIT};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub store_name: String,
    pub summary: StockSummary,
    /// Low-stock products furthest below their minimum.
    pub critical: Vec<ProductDto>,
    pub open_registers: usize,
    pub active_shifts: usize,
}

pub async fn dashboard(state: &AppState) -> Result<Response<DashboardResponse>, ApiError> {
    let products = state.db().products();
    let summary = products.stock_summary().await?;
    let critical = products.critical(CRITICAL_STOCK_LIMIT).await?;

    let open_registers = state
        .registers()
        .list_registers()
        .await?
        .iter()
        .filter(|r| r.is_open())
        .count();
    let active_shifts = state.registers().active_shifts().await?.len();

    let mut response = Response::new(DashboardResponse {
        store_name: state.config().store.name.clone(),
        summary,
        critical: critical.into_iter().map(ProductDto::from).collect(),
        open_registers,
        active_shifts,
    });

    if summary.out_of_stock > 0 {
        response.push(Notice::warning(format!(
            "{} product(s) out of stock",
            summary.out_of_stock
        )));
    }
    if summary.low_stock > 0 {
        response.push(Notice::warning(format!(
            "{} product(s) at or below minimum stock",
            summary.low_stock
        )));
    }

    Ok(response)
}
