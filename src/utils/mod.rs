//! Utility module - shared error types, logging and unit conversion

pub mod error;
pub mod logger;
pub mod units;

pub use error::{AppError, AppResponse, AppResult};
