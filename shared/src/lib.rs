//! Shared domain types for the AgriMarket Order Core
//!
//! This crate contains the inventory, pricing, order, commission, and
//! recurring-schedule aggregates. State transitions live here as pure
//! operations (clocks are passed in) so the backend can persist whole
//! aggregates and the logic stays testable without a database.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
