//! Shared types and models for the Stock Ledger Platform
//!
//! This crate contains types shared between the backend service and
//! other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
