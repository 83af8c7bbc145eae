//! Service layer
//!
//! Business logic over the repositories and the cache port:
//!
//! - [`CatalogService`] - menu catalog (read-through cached)
//! - [`InventoryService`] - stock ledger, alerts, low-stock policy
//! - [`OrderService`] - the order placement pipeline
//!
//! Services are constructed once in `core::state` and injected where
//! needed; none of them owns global state.

pub mod catalog;
pub mod inventory;
pub mod orders;

pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use orders::{OrderError, OrderService};
