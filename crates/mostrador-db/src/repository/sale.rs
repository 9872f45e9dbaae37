//! # Sale Repository
//!
//! Database operations for sales and their line items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. COMMIT (one write transaction, see service::checkout)              │
//! │     └── insert_sale()       sale row with computed totals              │
//! │     └── insert_line_item()  one row per line, in order                 │
//! │                                                                         │
//! │  2. (OPTIONAL, staff) EDIT HEADER                                      │
//! │     └── update_header()     customer name, payment method              │
//! │                                                                         │
//! │  3. (OPTIONAL, staff) DELETE                                           │
//! │     └── delete()            line items cascade; stock is not restored  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line items are immutable once committed.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mostrador_core::{PaymentMethod, Sale, SaleLineItem};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT
                id, shift_id, customer_name,
                subtotal_cents, discount_cents, total_cents,
                payment_method, tendered_cents, change_cents,
                created_at, updated_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Most recent sales first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT
                id, shift_id, customer_name,
                subtotal_cents, discount_cents, total_cents,
                payment_method, tendered_cents, change_cents,
                created_at, updated_at
            FROM sales
            ORDER BY created_at DESC, id
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Line items of a sale in submitted order.
    pub async fn get_line_items(&self, sale_id: &str) -> DbResult<Vec<SaleLineItem>> {
        let items = sqlx::query_as::<_, SaleLineItem>(
            r#"
            SELECT id, sale_id, line_no, product_id, quantity, unit_price_cents, subtotal_cents
            FROM sale_line_items
            WHERE sale_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Edits the header fields a staff member may correct after the fact.
    pub async fn update_header(
        &self,
        id: &str,
        customer_name: Option<&str>,
        payment_method: PaymentMethod,
    ) -> DbResult<Sale> {
        debug!(id = %id, "Updating sale header");

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET
                customer_name = ?2,
                payment_method = ?3,
                updated_at = ?4
            WHERE id = ?1
            RETURNING
                id, shift_id, customer_name,
                subtotal_cents, discount_cents, total_cents,
                payment_method, tendered_cents, change_cents,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(customer_name)
        .bind(payment_method)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        sale.ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Deletes a sale and its line items.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Inserts the sale row. Called inside the checkout transaction, before
    /// its line items.
    pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, total_cents = sale.total_cents, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, shift_id, customer_name,
                subtotal_cents, discount_cents, total_cents,
                payment_method, tendered_cents, change_cents,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.shift_id)
        .bind(&sale.customer_name)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.tendered_cents)
        .bind(sale.change_cents)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn insert_line_item(conn: &mut SqliteConnection, item: &SaleLineItem) -> DbResult<()> {
        debug!(
            sale_id = %item.sale_id,
            line_no = item.line_no,
            product_id = %item.product_id,
            quantity = item.quantity,
            "Inserting sale line item"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_line_items (
                id, sale_id, line_no, product_id, quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .execute(conn)
        .await?;

        Ok(())
    }
}
