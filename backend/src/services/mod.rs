//! Business logic services for the Stock Ledger Platform

pub mod adjustment;
pub mod consumption;
pub mod dispatcher;
pub mod fractionation;
pub mod lot;
pub mod movement;
pub mod outbox;
pub mod product;
pub mod receipt;
pub mod stock;
pub mod transfer;
pub mod warehouse;
