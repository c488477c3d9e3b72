//! Business logic services for the AgriMarket Order Core

pub mod commission;
pub mod inventory;
pub mod order;
pub mod pricing;
pub mod schedule;

pub use commission::CommissionService;
pub use inventory::InventoryService;
pub use order::OrderService;
pub use pricing::PricingService;
pub use schedule::ScheduleService;
