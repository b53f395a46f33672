//! Stock Ledger Platform - Backend
//!
//! Lot ledger and movement engine for a multi-warehouse goods business:
//! receipt intake, FIFO consumption, inter-warehouse transfer,
//! fractionation, the stock-aggregate invariant and the integration
//! outbox.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
}
