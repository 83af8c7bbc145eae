//! Domain models
//!
//! One file per aggregate, plus the create/update DTOs used by the admin
//! surface. All money and stock quantities are `rust_decimal::Decimal` at
//! this level; the repositories convert to integer minor units at the
//! storage boundary (see `utils::units`).

pub mod alert;
pub mod food_item;
pub mod ingredient;
pub mod order;

pub use alert::{AiAlert, AlertDraft, AlertSeverity, AlertType};
pub use food_item::{
    FoodIngredient, FoodItem, FoodItemCreate, FoodItemSummary, FoodItemUpdate,
    IngredientRequirement,
};
pub use ingredient::{Ingredient, IngredientCreate};
pub use order::{CartLine, Order, OrderItem, OrderPage, OrderStatus, Pagination};
