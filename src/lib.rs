//! Tiffin Server - restaurant ordering backend
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/      # Config, state, server
//! ├── api/       # HTTP routes and handlers
//! ├── auth/      # Admin gate
//! ├── cache/     # Cache port (memory / redis)
//! ├── db/        # Pool, models, repositories
//! ├── services/  # Catalog, inventory, order pipeline
//! ├── ai/        # Suggestion gateway
//! └── utils/     # Errors, logging, unit conversion
//! ```
//!
//! The core of the system is the order placement pipeline
//! ([`services::OrderService`]): validate a cart, fold it into aggregate
//! ingredient deductions, run one transaction (order + atomic stock
//! decrements + low-stock alerts), then invalidate the dependent caches.

pub mod ai;
pub mod api;
pub mod auth;
pub mod cache;
pub mod core;
pub mod db;
pub mod services;
pub mod utils;

// Re-export common types
pub use cache::{CacheStore, MemoryCache, RedisCache};
pub use core::{Config, Server, ServerState};
pub use services::{CatalogService, InventoryService, OrderService};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
