//! Core domain types and logic.

pub mod error;
pub mod price;
pub mod trade;
pub mod ledger;
pub mod simulation;
pub mod metrics;
pub mod report;
pub mod config_validation;
