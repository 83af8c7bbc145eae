//! Ingredient model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stock-tracked ingredient
///
/// `quantity` is the current stock level in `unit`s. It is mutated only
/// through the atomic increment/decrement in the repository; it may go
/// negative transiently under concurrent orders, which is flagged CRITICAL
/// by the low-stock policy rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub quantity: Decimal,
    /// Reorder point: stock below this raises a low-stock alert
    pub threshold: Decimal,
    pub unit: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn is_low_stock(&self) -> bool {
        self.quantity < self.threshold
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientCreate {
    pub name: String,
    pub quantity: Decimal,
    pub threshold: Decimal,
    pub unit: String,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}
