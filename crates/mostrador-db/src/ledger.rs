//! # Product Ledger
//!
//! Locked reads and stock decrements of products inside one write
//! transaction.
//!
//! ```text
//! let mut tx = db.begin_write().await?;        writer lock held
//! let mut ledger = ProductLedger::new(&mut tx);
//!
//! ledger.get_for_update("p1")  ──► Product     marks p1 as locked
//! ledger.decrement_stock("p1", 3) ──► StockChange
//! ledger.decrement_stock("p2", 1) ──► Err      p2 never locked
//!
//! tx.commit()                                  or drop = rollback
//! ```
//!
//! The writer lock taken by [`Database::begin_write`](crate::Database::begin_write)
//! covers every row, so `get_for_update` only needs to read. The ledger still
//! tracks which products were fetched for update so a decrement can never
//! act on stock the caller has not checked.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{DbError, ServiceResult};
use mostrador_core::{CoreError, Product, StockChange};

pub struct ProductLedger<'c> {
    conn: &'c mut SqliteConnection,
    locked: HashSet<String>,
}

impl<'c> ProductLedger<'c> {
    /// Wraps a connection that is inside a write transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductLedger {
            conn,
            locked: HashSet::new(),
        }
    }

    /// Fetches a product and records it as locked for the rest of the
    /// transaction.
    ///
    /// Fails with [`CoreError::ProductNotFound`] for unknown ids.
    pub async fn get_for_update(&mut self, product_id: &str) -> ServiceResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, stock_minimum, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        debug!(product_id = %product_id, stock = ?product.stock, "Product locked");
        self.locked.insert(product.id.clone());
        Ok(product)
    }

    /// True when `product_id` was fetched with [`Self::get_for_update`].
    pub fn is_locked(&self, product_id: &str) -> bool {
        self.locked.contains(product_id)
    }

    /// Reduces the stock of a locked product by `quantity`.
    ///
    /// Fails with [`CoreError::UndefinedStock`] when stock is not tracked and
    /// with [`CoreError::InsufficientStock`] when fewer than `quantity` units
    /// remain. The returned change reports whether the product is now at or
    /// below its minimum.
    pub async fn decrement_stock(
        &mut self,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<StockChange> {
        if !self.is_locked(product_id) {
            return Err(DbError::Internal(format!(
                "stock of product {} changed without a prior lock",
                product_id
            ))
            .into());
        }

        let updated: Option<(String, i64, i64)> = sqlx::query_as(
            r#"
            UPDATE products SET
                stock = stock - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock IS NOT NULL AND stock >= ?2
            RETURNING name, stock, stock_minimum
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *self.conn)
        .await?;

        match updated {
            Some((name, remaining, stock_minimum)) => {
                let change = StockChange {
                    product_id: product_id.to_string(),
                    name,
                    previous: remaining + quantity,
                    remaining,
                    stock_minimum,
                };

                if change.is_low() {
                    warn!(
                        product_id = %product_id,
                        remaining,
                        stock_minimum,
                        "Product at or below minimum stock"
                    );
                }

                Ok(change)
            }
            None => Err(self.rejection(product_id, quantity).await?.into()),
        }
    }

    /// Explains why a decrement matched no row.
    async fn rejection(&mut self, product_id: &str, quantity: i64) -> ServiceResult<CoreError> {
        let current: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *self.conn)
                .await?;

        Ok(match current {
            None => CoreError::ProductNotFound(product_id.to_string()),
            Some((name, None)) => CoreError::UndefinedStock {
                product_id: product_id.to_string(),
                name,
            },
            Some((name, Some(available))) => CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                name,
                available,
                requested: quantity,
            },
        })
    }

    /// The underlying connection, for other writes of the same transaction.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut *self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::test_utils::{seed_product, test_db};

    #[tokio::test]
    async fn test_lock_then_decrement() {
        let db = test_db().await;
        let product = seed_product(&db, "Fideos", 650, Some(5), 2).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = ProductLedger::new(&mut tx);

        let locked = ledger.get_for_update(&product.id).await.unwrap();
        assert_eq!(locked.stock, Some(5));

        let change = ledger.decrement_stock(&product.id, 3).await.unwrap();
        assert_eq!(change.previous, 5);
        assert_eq!(change.remaining, 2);
        assert!(change.is_low());

        tx.commit().await.unwrap();

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;
        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = ProductLedger::new(&mut tx);

        let err = ledger.get_for_update("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Rule(CoreError::ProductNotFound(ref id)) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_decrement_requires_lock() {
        let db = test_db().await;
        let product = seed_product(&db, "Sal", 300, Some(5), 1).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = ProductLedger::new(&mut tx);
        let err = ledger.decrement_stock(&product.id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Db(DbError::Internal(_))));
    }

    #[tokio::test]
    async fn test_decrement_rejections() {
        let db = test_db().await;
        let scarce = seed_product(&db, "Queso", 2500, Some(2), 1).await;
        let untracked = seed_product(&db, "Bolsa", 50, None, 0).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = ProductLedger::new(&mut tx);
        ledger.get_for_update(&scarce.id).await.unwrap();
        ledger.get_for_update(&untracked.id).await.unwrap();

        let err = ledger.decrement_stock(&scarce.id, 5).await.unwrap_err();
        assert!(matches!(
            err.rule(),
            Some(CoreError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            })
        ));

        let err = ledger.decrement_stock(&untracked.id, 1).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::UndefinedStock { .. })));
    }
}
