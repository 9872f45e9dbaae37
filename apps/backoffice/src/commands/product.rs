//! # Product Commands
//!
//! Catalog maintenance. Saving a product that is at or below its minimum
//! stock succeeds with a low-stock warning.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::notice::{Notice, Response};
use crate::state::AppState;
use mostrador_core::validation::validate_product_form;
use mostrador_core::{Product, ProductForm, StockStatus};
use mostrador_db::DbError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    /// None when the product does not track stock.
    pub stock: Option<i64>,
    pub stock_minimum: i64,
    pub status: StockStatus,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        let status = p.stock_status();
        ProductDto {
            id: p.id,
            name: p.name,
            price_cents: p.price_cents,
            stock: p.stock,
            stock_minimum: p.stock_minimum,
            status,
        }
    }
}

pub async fn list_products(state: &AppState) -> Result<Vec<ProductDto>, ApiError> {
    let products = state.db().products().list().await?;
    Ok(products.into_iter().map(ProductDto::from).collect())
}

pub async fn get_product(state: &AppState, id: &str) -> Result<ProductDto, ApiError> {
    let product = state
        .db()
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(product.into())
}

pub async fn create_product(
    state: &AppState,
    form: &ProductForm,
) -> Result<Response<ProductDto>, ApiError> {
    debug!(name = %form.name, "create_product command");

    let form = validate_product_form(form)?;
    let product = state.db().products().insert(&form).await?;

    info!(product_id = %product.id, "Product created");
    Ok(saved(product, "Product created"))
}

pub async fn update_product(
    state: &AppState,
    id: &str,
    form: &ProductForm,
) -> Result<Response<ProductDto>, ApiError> {
    debug!(id = %id, "update_product command");

    let form = validate_product_form(form)?;
    let product = state.db().products().update(id, &form).await?;

    info!(product_id = %id, "Product updated");
    Ok(saved(product, "Product updated"))
}

pub async fn delete_product(state: &AppState, id: &str) -> Result<Response<()>, ApiError> {
    debug!(id = %id, "delete_product command");

    match state.db().products().delete(id).await {
        Ok(()) => Ok(Response::new(()).with(Notice::success("Product deleted"))),
        Err(DbError::ForeignKeyViolation { .. }) => Err(ApiError::rule(
            "The product appears on recorded sales and cannot be deleted",
        )),
        Err(e) => Err(e.into()),
    }
}

fn saved(product: Product, message: &str) -> Response<ProductDto> {
    let mut response = Response::new(ProductDto::from(product.clone())).with(Notice::success(message));

    if product.needs_restock() {
        response.push(Notice::warning(format!(
            "Low stock: {} has {} left (minimum {})",
            product.name,
            product.stock.unwrap_or_default(),
            product.stock_minimum
        )));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::create_sale;
    use crate::config::BackofficeConfig;
    use crate::error::ErrorCode;
    use mostrador_core::{LineItemRequest, PaymentMethod, SaleRequest};
    use mostrador_db::test_utils::{open_shift, test_db};

    fn form(name: &str, stock: Option<i64>, stock_minimum: i64) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            price_cents: 990,
            stock,
            stock_minimum,
        }
    }

    #[tokio::test]
    async fn test_save_warns_on_low_stock() {
        let state = AppState::new(test_db().await, BackofficeConfig::default());

        let created = create_product(&state, &form("Queso", Some(10), 3)).await.unwrap();
        assert_eq!(created.data.status, StockStatus::Normal);
        assert!(!created.has_warnings());

        let updated = update_product(&state, &created.data.id, &form("Queso", Some(2), 3))
            .await
            .unwrap();
        assert_eq!(updated.data.status, StockStatus::Low);
        assert!(updated.has_warnings());

        let untracked = create_product(&state, &form("Bolsa", None, 0)).await.unwrap();
        assert_eq!(untracked.data.status, StockStatus::Untracked);
        assert!(!untracked.has_warnings());
    }

    #[tokio::test]
    async fn test_invalid_form_lists_fields() {
        let state = AppState::new(test_db().await, BackofficeConfig::default());

        let bad = ProductForm {
            name: "  ".into(),
            price_cents: -1,
            stock: Some(-3),
            stock_minimum: 0,
        };
        let err = create_product(&state, &bad).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.fields.len(), 3);
        assert!(list_products(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sold_product_cannot_be_deleted() {
        let state = AppState::new(test_db().await, BackofficeConfig::default());
        let shift = open_shift(state.db(), "Centro").await;
        let product = create_product(&state, &form("Queso", Some(10), 3))
            .await
            .unwrap()
            .data;

        create_sale(
            &state,
            &SaleRequest {
                shift_id: shift.id,
                customer_name: None,
                discount_cents: 0,
                payment_method: PaymentMethod::Card,
                tendered_cents: None,
                line_items: vec![LineItemRequest {
                    product_id: product.id.clone(),
                    quantity: 1,
                }],
            },
        )
        .await
        .unwrap();

        let err = delete_product(&state, &product.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert_eq!(get_product(&state, &product.id).await.unwrap().stock, Some(9));

        let err = delete_product(&state, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
