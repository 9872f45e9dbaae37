//! # Mostrador Back-office
//!
//! The application layer over `mostrador-db`: configuration, logging setup,
//! error-to-notice mapping and the command functions a front end calls.
//!
//! ## Module Organization
//! ```text
//! backoffice/
//! ├── lib.rs          ◄─── You are here (logging setup)
//! ├── config.rs       ◄─── BackofficeConfig (defaults, TOML, env)
//! ├── state.rs        ◄─── AppState: database + services
//! ├── error.rs        ◄─── ApiError with code and disposition
//! ├── notice.rs       ◄─── Success / warning / error notices
//! ├── commands/       ◄─── register, sale, employee, product, dashboard
//! └── main.rs         ◄─── Command-line front end
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. init_tracing()       RUST_LOG or "info,mostrador=debug,sqlx=warn"   │
//! │  2. BackofficeConfig::load(path)                                        │
//! │  3. AppState::connect(config)   opens SQLite, runs migrations           │
//! │  4. run commands                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod notice;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use config::BackofficeConfig;
pub use error::{ApiError, Disposition, ErrorCode};
pub use notice::{Notice, NoticeLevel, Response};
pub use state::AppState;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,mostrador=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=mostrador_db=trace` - Trace the database crate only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Logs go to stderr so command output on stdout stays valid JSON.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
