//! HTTP handlers for the AgriMarket Order Core

pub mod agreements;
pub mod commissions;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod schedules;

pub use agreements::*;
pub use commissions::*;
pub use health::*;
pub use inventory::*;
pub use orders::*;
pub use schedules::*;
