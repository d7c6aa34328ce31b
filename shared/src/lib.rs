//! Shared types and domain rules for the Inventory & POS backend
//!
//! This crate holds the pieces that do not touch the database: the stock
//! reconciliation rules, request-independent validation helpers, and the
//! small value types used by the backend services and handlers.

pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;

pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
