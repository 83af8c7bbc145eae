//! Repository Module
//!
//! One repository per aggregate, each a thin wrapper over the pool.
//! Operations that must run inside the order transaction (`create_with_items`,
//! `adjust_stock_on`, `create_many`) are associated functions taking
//! `&mut SqliteConnection` so the caller controls the transaction scope.

pub mod alert;
pub mod food_item;
pub mod ingredient;
pub mod order;

pub use alert::AlertRepository;
pub use food_item::FoodItemRepository;
pub use ingredient::IngredientRepository;
pub use order::OrderRepository;

use crate::utils::AppError;
use crate::utils::units::UnitError;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<UnitError> for RepoError {
    fn from(err: UnitError) -> Self {
        RepoError::Validation(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Generate a new record id
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
