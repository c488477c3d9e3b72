//! Domain models for the AgriMarket Order Core

mod agreement;
mod commission;
mod lot;
mod order;
mod schedule;

pub use agreement::*;
pub use commission::*;
pub use lot::*;
pub use order::*;
pub use schedule::*;
