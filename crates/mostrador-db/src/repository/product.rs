//! # Product Repository
//!
//! Catalog CRUD and the stock alert queries behind the dashboard.
//!
//! Stock mutations caused by sales do not go through this repository; they
//! happen inside a sale transaction via [`crate::ledger::ProductLedger`].
//!
//! ## Stock Alerts
//! ```text
//! stock            status        shown in
//! ─────────────    ──────────    ─────────────────────────────
//! NULL             untracked     (nowhere)
//! 0                out of stock  out_of_stock, low_stock, critical
//! <= minimum       low           low_stock, critical
//! >  minimum       normal        stock_summary.normal
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mostrador_core::{Product, ProductForm, StockSummary};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, stock_minimum, created_at, updated_at
            FROM products
            ORDER BY name COLLATE NOCASE, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, stock_minimum, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a product from a validated form.
    pub async fn insert(&self, form: &ProductForm) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: form.name.clone(),
            price_cents: form.price_cents,
            stock: form.stock,
            stock_minimum: form.stock_minimum,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, stock, stock_minimum, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.stock_minimum)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Replaces the editable fields of a product.
    pub async fn update(&self, id: &str, form: &ProductForm) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = ?2,
                price_cents = ?3,
                stock = ?4,
                stock_minimum = ?5,
                updated_at = ?6
            WHERE id = ?1
            RETURNING id, name, price_cents, stock, stock_minimum, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&form.name)
        .bind(form.price_cents)
        .bind(form.stock)
        .bind(form.stock_minimum)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product. Fails with a foreign key violation when the
    /// product appears on committed sales.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Products with defined stock at or below their minimum.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, stock_minimum, created_at, updated_at
            FROM products
            WHERE stock IS NOT NULL AND stock <= stock_minimum
            ORDER BY stock ASC, name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Products with no units left.
    pub async fn out_of_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, stock_minimum, created_at, updated_at
            FROM products
            WHERE stock = 0
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// The low-stock products furthest below their minimum, worst first.
    pub async fn critical(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, stock_minimum, created_at, updated_at
            FROM products
            WHERE stock IS NOT NULL AND stock <= stock_minimum
            ORDER BY (stock_minimum - stock) DESC, name COLLATE NOCASE
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts for the stock dashboard.
    pub async fn stock_summary(&self) -> DbResult<StockSummary> {
        let (total, low_stock, out_of_stock, normal): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN stock IS NOT NULL AND stock <= stock_minimum THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN stock = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN stock > stock_minimum THEN 1 ELSE 0 END), 0)
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StockSummary {
            total,
            low_stock,
            out_of_stock,
            normal,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_product, test_db};

    fn form(name: &str, stock: Option<i64>, minimum: i64) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            price_cents: 1500,
            stock,
            stock_minimum: minimum,
        }
    }

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let db = test_db().await;
        let repo = db.products();

        let inserted = repo.insert(&form("Cafe 250g", Some(10), 3)).await.unwrap();
        let fetched = repo.get_by_id(&inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Cafe 250g");
        assert_eq!(fetched.stock, Some(10));

        let updated = repo
            .update(&inserted.id, &form("Cafe 500g", None, 1))
            .await
            .unwrap();
        assert_eq!(updated.name, "Cafe 500g");
        assert_eq!(updated.stock, None);

        repo.delete(&inserted.id).await.unwrap();
        assert!(repo.get_by_id(&inserted.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&inserted.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = test_db().await;
        let result = db.products().update("missing", &form("X", None, 0)).await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_by_schema() {
        let db = test_db().await;
        let result = db.products().insert(&form("Bad", Some(-1), 0)).await;
        assert!(matches!(result, Err(DbError::CheckViolation(_))));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let db = test_db().await;
        seed_product(&db, "pan", 100, Some(5), 1).await;
        seed_product(&db, "Aceite", 100, Some(5), 1).await;
        seed_product(&db, "Leche", 100, None, 1).await;

        let names: Vec<String> = db
            .products()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Aceite", "Leche", "pan"]);
    }

    #[tokio::test]
    async fn test_stock_alert_queries() {
        let db = test_db().await;
        seed_product(&db, "Normal", 100, Some(10), 2).await;
        seed_product(&db, "At minimum", 100, Some(2), 2).await;
        seed_product(&db, "Empty", 100, Some(0), 3).await;
        seed_product(&db, "Slightly low", 100, Some(4), 5).await;
        seed_product(&db, "Untracked", 100, None, 2).await;

        let repo = db.products();

        assert_eq!(repo.low_stock().await.unwrap().len(), 3);
        assert_eq!(repo.out_of_stock().await.unwrap()[0].name, "Empty");

        let critical: Vec<String> = repo
            .critical(2)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(critical, vec!["Empty", "Slightly low"]);

        let summary = repo.stock_summary().await.unwrap();
        assert_eq!(
            summary,
            StockSummary {
                total: 5,
                low_stock: 3,
                out_of_stock: 1,
                normal: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_summary_of_empty_catalog() {
        let db = test_db().await;
        assert_eq!(
            db.products().stock_summary().await.unwrap(),
            StockSummary::default()
        );
    }
}
