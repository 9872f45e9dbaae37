//! # Sale Transaction Processor
//!
//! Commits a checkout atomically: every line is locked and validated before
//! anything is written, and any failure rolls the whole sale back.
//!
//! ## Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_sale_request            FormErrors (no transaction yet)       │
//! │                                                                         │
//! │  BEGIN + writer lock ─────────────────────────────────────────────┐     │
//! │  │ shift active?                  NoActiveShift                   │     │
//! │  │ lines present, ≤ 100?          EmptyCart / CartTooLarge        │     │
//! │  │ for each line, in order:                                       │     │
//! │  │     get_for_update(product)    ProductNotFound                 │     │
//! │  │     tally.reserve(qty)         UndefinedStock / Insufficient   │     │
//! │  │ totals, change                 DiscountExceeds / InsufficientT │     │
//! │  │ ─── nothing written above this line ───                        │     │
//! │  │ insert sale                                                    │     │
//! │  │ for each line: insert line item, decrement stock               │     │
//! │  COMMIT ◄─────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  Any error: the transaction is dropped, which rolls it back.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two sales competing for the same product serialize on the writer lock;
//! the second one sees the first one's committed stock.

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::ledger::ProductLedger;
use crate::repository::register::RegisterRepository;
use crate::repository::sale::SaleRepository;
use crate::Database;
use mostrador_core::checkout::{
    change_due, ensure_sellable_cart, price_line, validate_sale_request, SaleTotals, StockTally,
};
use mostrador_core::permissions::require_staff;
use mostrador_core::validation::validate_customer_name;
use mostrador_core::{
    Actor, CompletedSale, CoreError, FormErrors, Money, PaymentMethod, Product, Sale,
    SaleLineItem, SaleRequest, Shift,
};

/// Default page size of [`SaleProcessor::list_sales`].
pub const SALE_LIST_LIMIT: u32 = 200;

#[derive(Debug, Clone)]
pub struct SaleProcessor {
    db: Database,
}

impl SaleProcessor {
    pub fn new(db: Database) -> Self {
        SaleProcessor { db }
    }

    /// Validates and commits a sale.
    ///
    /// On success every product on the sale has lost exactly the requested
    /// quantity and the returned [`CompletedSale`] lists the stock changes.
    /// On any error nothing is persisted.
    #[instrument(skip(self, request), fields(shift_id = %request.shift_id, lines = request.line_items.len()))]
    pub async fn process_sale(&self, request: &SaleRequest) -> ServiceResult<CompletedSale> {
        let request = validate_sale_request(request)?;

        match self.commit_sale(&request).await {
            Ok(completed) => {
                info!(
                    sale_id = %completed.sale.id,
                    total_cents = completed.sale.total_cents,
                    change_cents = completed.sale.change_cents,
                    low_stock = completed.low_stock_alerts().len(),
                    "Sale committed"
                );
                Ok(completed)
            }
            Err(ServiceError::Rule(rule)) => {
                warn!(reason = %rule, "Sale rejected, rolled back");
                Err(ServiceError::Rule(rule))
            }
            Err(e) => {
                error!(error = %e, "Sale failed, rolled back");
                Err(e)
            }
        }
    }

    async fn commit_sale(&self, request: &SaleRequest) -> ServiceResult<CompletedSale> {
        let mut tx = self.db.begin_write().await?;

        let shift = RegisterRepository::find_shift(&mut tx, &request.shift_id)
            .await?
            .filter(Shift::is_active)
            .ok_or_else(|| CoreError::NoActiveShift {
                shift_id: request.shift_id.clone(),
            })?;

        ensure_sellable_cart(&request.line_items)?;

        let mut ledger = ProductLedger::new(&mut tx);

        // Lock and validate every line before writing anything.
        let mut tally = StockTally::default();
        let mut products: Vec<Product> = Vec::with_capacity(request.line_items.len());
        for line in &request.line_items {
            let product = ledger.get_for_update(&line.product_id).await?;
            tally.reserve(&product, line.quantity)?;
            products.push(product);
        }

        let subtotals: Vec<Money> = request
            .line_items
            .iter()
            .zip(&products)
            .map(|(line, product)| price_line(product, line.quantity))
            .collect::<Result<_, _>>()?;

        let totals = SaleTotals::compute(
            subtotals.iter().copied(),
            Money::from_cents(request.discount_cents),
        )?;
        let tendered = request.tendered_cents.map(Money::from_cents);
        let change = change_due(totals.total, tendered)?;

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id,
            customer_name: request.customer_name.clone(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            payment_method: request.payment_method,
            tendered_cents: request.tendered_cents,
            change_cents: change.cents(),
            created_at: now,
            updated_at: now,
        };
        SaleRepository::insert_sale(ledger.connection(), &sale).await?;

        let mut line_items = Vec::with_capacity(products.len());
        let mut stock_changes = Vec::with_capacity(products.len());
        for (idx, ((line, product), subtotal)) in request
            .line_items
            .iter()
            .zip(&products)
            .zip(&subtotals)
            .enumerate()
        {
            let item = SaleLineItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                line_no: idx as i64 + 1,
                product_id: product.id.clone(),
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                subtotal_cents: subtotal.cents(),
            };
            SaleRepository::insert_line_item(ledger.connection(), &item).await?;

            stock_changes.push(ledger.decrement_stock(&product.id, line.quantity).await?);
            line_items.push(item);
        }

        tx.commit().await?;

        Ok(CompletedSale {
            sale,
            line_items,
            stock_changes,
        })
    }

    /// A sale with its line items.
    pub async fn get_sale(&self, sale_id: &str) -> ServiceResult<(Sale, Vec<SaleLineItem>)> {
        let sales = self.db.sales();
        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        let items = sales.get_line_items(sale_id).await?;
        Ok((sale, items))
    }

    /// Most recent sales first.
    pub async fn list_sales(&self, limit: u32) -> ServiceResult<Vec<Sale>> {
        Ok(self.db.sales().list(limit).await?)
    }

    /// Corrects the customer name and payment method of a committed sale.
    /// Staff only.
    pub async fn update_sale_header(
        &self,
        actor: &Actor,
        sale_id: &str,
        customer_name: Option<&str>,
        payment_method: PaymentMethod,
    ) -> ServiceResult<Sale> {
        require_staff(actor, "edit sales")?;

        let customer_name = validate_customer_name(customer_name).map_err(FormErrors::from)?;

        let sale = self
            .db
            .sales()
            .update_header(sale_id, customer_name.as_deref(), payment_method)
            .await?;

        info!(actor = %actor.user_id, sale_id = %sale_id, "Sale header updated");
        Ok(sale)
    }

    /// Deletes a sale and its line items. Staff only. Stock is not restored.
    pub async fn delete_sale(&self, actor: &Actor, sale_id: &str) -> ServiceResult<()> {
        require_staff(actor, "delete sales")?;

        self.db.sales().delete(sale_id).await?;

        info!(actor = %actor.user_id, sale_id = %sale_id, "Sale deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::register::RegisterManager;
    use crate::test_utils::{open_shift, seed_identity, seed_product, test_db};
    use crate::DbConfig;
    use mostrador_core::{BranchMap, LineItemRequest, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

    fn line(product: &Product, quantity: i64) -> LineItemRequest {
        LineItemRequest {
            product_id: product.id.clone(),
            quantity,
        }
    }

    fn sale_request(shift: &Shift, discount_cents: i64, lines: Vec<LineItemRequest>) -> SaleRequest {
        SaleRequest {
            shift_id: shift.id.clone(),
            customer_name: None,
            discount_cents,
            payment_method: PaymentMethod::Cash,
            tendered_cents: None,
            line_items: lines,
        }
    }

    async fn stock_of(db: &Database, product: &Product) -> Option<i64> {
        db.products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn test_sale_then_insufficient_stock_scenario() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let p = seed_product(&db, "Aceite 1L", 1000, Some(5), 2).await;
        let processor = SaleProcessor::new(db.clone());

        // Three units at 10.00 with a 5.00 discount.
        let completed = processor
            .process_sale(&sale_request(&shift, 500, vec![line(&p, 3)]))
            .await
            .unwrap();

        assert_eq!(completed.sale.subtotal_cents, 3000);
        assert_eq!(completed.sale.total_cents, 2500);
        assert_eq!(completed.line_items.len(), 1);
        assert_eq!(completed.line_items[0].subtotal_cents, 3000);
        assert_eq!(stock_of(&db, &p).await, Some(2));

        let alerts = completed.low_stock_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].remaining, 2);

        // Five more units with only two left.
        let err = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 5)]))
            .await
            .unwrap_err();
        match err.rule() {
            Some(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_id, &p.id);
                assert_eq!(*available, 2);
                assert_eq!(*requested, 5);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(stock_of(&db, &p).await, Some(2));
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_whole_sale() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let plenty = seed_product(&db, "Arroz", 900, Some(50), 5).await;
        let scarce = seed_product(&db, "Cafe", 3000, Some(1), 0).await;
        let processor = SaleProcessor::new(db.clone());

        let err = processor
            .process_sale(&sale_request(
                &shift,
                0,
                vec![line(&plenty, 10), line(&scarce, 2)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::InsufficientStock { .. })));

        assert_eq!(stock_of(&db, &plenty).await, Some(50));
        assert_eq!(stock_of(&db, &scarce).await, Some(1));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_totals_match_line_items() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let a = seed_product(&db, "Leche", 650, Some(20), 2).await;
        let b = seed_product(&db, "Pan", 120, Some(100), 10).await;
        let processor = SaleProcessor::new(db.clone());

        let mut request = sale_request(&shift, 150, vec![line(&a, 2), line(&b, 6)]);
        request.tendered_cents = Some(2000);
        request.customer_name = Some("  Rosa ".to_string());

        let completed = processor.process_sale(&request).await.unwrap();
        let (sale, items) = processor.get_sale(&completed.sale.id).await.unwrap();

        let line_sum: i64 = items.iter().map(|i| i.subtotal_cents).sum();
        assert_eq!(line_sum - sale.discount_cents, sale.total_cents);
        assert_eq!(sale.total_cents, 1300 + 720 - 150);
        assert_eq!(sale.change_cents, 2000 - 1870);
        assert_eq!(sale.customer_name.as_deref(), Some("Rosa"));
        assert_eq!(
            items.iter().map(|i| i.line_no).collect::<Vec<_>>(),
            vec![1, 2]
        );

        assert_eq!(stock_of(&db, &a).await, Some(18));
        assert_eq!(stock_of(&db, &b).await, Some(94));
    }

    #[tokio::test]
    async fn test_repeated_product_lines_are_checked_together() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let p = seed_product(&db, "Yerba", 2200, Some(4), 1).await;
        let processor = SaleProcessor::new(db.clone());

        let err = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 3), line(&p, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.rule(),
            Some(CoreError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            })
        ));
        assert_eq!(stock_of(&db, &p).await, Some(4));

        let completed = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 3), line(&p, 1)]))
            .await
            .unwrap();
        assert_eq!(completed.stock_changes.len(), 2);
        assert_eq!(completed.low_stock_alerts().len(), 1);
        assert_eq!(stock_of(&db, &p).await, Some(0));
    }

    #[tokio::test]
    async fn test_business_rule_rejections() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let p = seed_product(&db, "Harina", 1000, Some(10), 1).await;
        let untracked = seed_product(&db, "Bolsa", 50, None, 0).await;
        let processor = SaleProcessor::new(db.clone());

        let err = processor
            .process_sale(&sale_request(&shift, 0, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::EmptyCart)));

        let err = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&untracked, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::UndefinedStock { .. })));

        let missing = LineItemRequest {
            product_id: Uuid::new_v4().to_string(),
            quantity: 1,
        };
        let err = processor
            .process_sale(&sale_request(&shift, 0, vec![missing]))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::ProductNotFound(_))));

        let err = processor
            .process_sale(&sale_request(&shift, 1001, vec![line(&p, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::DiscountExceedsSubtotal { .. })));

        let mut short = sale_request(&shift, 0, vec![line(&p, 2)]);
        short.tendered_cents = Some(1500);
        let err = processor.process_sale(&short).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::InsufficientTender { .. })));

        let err = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::Form(_))));

        assert_eq!(stock_of(&db, &p).await, Some(10));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_or_unknown_shift() {
        let db = test_db().await;
        let cashier = seed_identity(&db, "cajero", false, false).await;
        let manager = RegisterManager::new(db.clone(), BranchMap::default());
        let opened = manager.open_register("Centro", &cashier).await.unwrap();
        let p = seed_product(&db, "Te", 500, Some(3), 1).await;
        let processor = SaleProcessor::new(db.clone());

        manager.close_register(&opened.register.id).await.unwrap();

        let err = processor
            .process_sale(&sale_request(&opened.shift, 0, vec![line(&p, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NoActiveShift { .. })));

        let mut unknown = sale_request(&opened.shift, 0, vec![line(&p, 1)]);
        unknown.shift_id = Uuid::new_v4().to_string();
        let err = processor.process_sale(&unknown).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NoActiveShift { .. })));

        assert_eq!(stock_of(&db, &p).await, Some(3));
    }

    #[tokio::test]
    async fn test_staff_only_maintenance() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let staff = seed_identity(&db, "admin", true, false).await;
        let cashier = seed_identity(&db, "cajero", false, false).await;
        let p = seed_product(&db, "Jugo", 800, Some(10), 2).await;
        let processor = SaleProcessor::new(db.clone());

        let completed = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 2)]))
            .await
            .unwrap();
        let sale_id = completed.sale.id.clone();

        let err = processor
            .update_sale_header(&cashier.actor(), &sale_id, Some("X"), PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::PermissionDenied(_))));

        let updated = processor
            .update_sale_header(&staff.actor(), &sale_id, Some("Marta"), PaymentMethod::Card)
            .await
            .unwrap();
        assert_eq!(updated.customer_name.as_deref(), Some("Marta"));
        assert_eq!(updated.payment_method, PaymentMethod::Card);
        assert_eq!(updated.total_cents, completed.sale.total_cents);

        assert!(processor.delete_sale(&cashier.actor(), &sale_id).await.is_err());
        processor.delete_sale(&staff.actor(), &sale_id).await.unwrap();

        assert!(db.sales().get_line_items(&sale_id).await.unwrap().is_empty());
        assert_eq!(processor.list_sales(SALE_LIST_LIMIT).await.unwrap().len(), 0);
        // Deleting a sale does not put stock back.
        assert_eq!(stock_of(&db, &p).await, Some(8));

        let err = processor.delete_sale(&staff.actor(), &sale_id).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_largest_allowed_sale_is_recorded() {
        let db = test_db().await;
        let shift = open_shift(&db, "Centro").await;
        let p = seed_product(&db, "Camioneta", MAX_PRICE_CENTS, Some(MAX_ITEM_QUANTITY), 0).await;
        let processor = SaleProcessor::new(db.clone());

        let completed = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, MAX_ITEM_QUANTITY)]))
            .await
            .unwrap();

        assert_eq!(completed.sale.total_cents, MAX_PRICE_CENTS * MAX_ITEM_QUANTITY);
        assert_eq!(stock_of(&db, &p).await, Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_wait_past_timeout_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("locked.db"))
            .max_connections(4)
            .lock_timeout(std::time::Duration::from_millis(100));
        let db = Database::new(config).await.unwrap();

        let shift = open_shift(&db, "Centro").await;
        let p = seed_product(&db, "Harina", 500, Some(10), 2).await;
        let processor = SaleProcessor::new(db.clone());

        let held = db.begin_write().await.unwrap();
        let err = processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 1)]))
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
        held.rollback().await.unwrap();

        assert_eq!(stock_of(&db, &p).await, Some(10));
        assert_eq!(db.sales().count().await.unwrap(), 0);

        // Once the lock is released the same sale goes through.
        processor
            .process_sale(&sale_request(&shift, 0, vec![line(&p, 1)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &p).await, Some(9));

        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_of_last_unit() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("concurrent.db"))
            .max_connections(4)
            .lock_timeout(std::time::Duration::from_secs(5));
        let db = Database::new(config).await.unwrap();

        let shift = open_shift(&db, "Centro").await;
        let p = seed_product(&db, "Ultimo", 1000, Some(1), 0).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let processor = SaleProcessor::new(db.clone());
            let request = sale_request(&shift, 0, vec![line(&p, 1)]);
            handles.push(tokio::spawn(async move {
                processor.process_sale(&request).await
            }));
        }

        let mut committed = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(e) if matches!(e.rule(), Some(CoreError::InsufficientStock { .. })) => {
                    insufficient += 1
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(stock_of(&db, &p).await, Some(0));
        assert_eq!(db.sales().count().await.unwrap(), 1);

        db.close().await;
    }
}
