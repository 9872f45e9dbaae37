//! Helpers for database tests: an in-memory database with migrations
//! applied, and seed functions for identities, products and open shifts.
//!
//! Compiled for this crate's own tests and, through the `test-utils`
//! feature, for dependent crates' tests.

use uuid::Uuid;

use crate::service::register::RegisterManager;
use crate::{Database, DbConfig};
use mostrador_core::{AuthIdentity, BranchMap, Product, ProductForm, Shift};

/// Installs a test-writer tracing subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mostrador=debug,sqlx=warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory database with the schema applied.
pub async fn test_db() -> Database {
    init_test_tracing();
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Inserts an active identity.
pub async fn seed_identity(
    db: &Database,
    username: &str,
    is_staff: bool,
    is_superuser: bool,
) -> AuthIdentity {
    let identity = AuthIdentity {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: format!("{}@mostrador.test", username),
        is_staff,
        is_superuser,
        is_active: true,
    };
    db.identities()
        .insert(&identity)
        .await
        .expect("seed identity");
    identity
}

pub async fn seed_product(
    db: &Database,
    name: &str,
    price_cents: i64,
    stock: Option<i64>,
    stock_minimum: i64,
) -> Product {
    db.products()
        .insert(&ProductForm {
            name: name.to_string(),
            price_cents,
            stock,
            stock_minimum,
        })
        .await
        .expect("seed product")
}

/// Opens a register at `location` for a new cashier and returns its shift.
pub async fn open_shift(db: &Database, location: &str) -> Shift {
    let cashier = seed_identity(db, &format!("cashier-{}", Uuid::new_v4()), false, false).await;
    RegisterManager::new(db.clone(), BranchMap::default())
        .open_register(location, &cashier)
        .await
        .expect("open register")
        .shift
}
