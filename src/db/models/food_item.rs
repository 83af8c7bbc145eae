//! Food item model

use super::ingredient::Ingredient;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A menu item with its ingredient requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ingredients: Vec<FoodIngredient>,
}

/// One ingredient requirement of a food item (join row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodIngredient {
    pub id: String,
    /// Quantity of the ingredient consumed per unit of the food item,
    /// in the ingredient's unit
    pub qty_required: Decimal,
    pub ingredient: Ingredient,
}

/// Denormalized food snapshot carried by order listings and suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemSummary {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRequirement {
    pub ingredient_id: String,
    pub qty_required: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemCreate {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientRequirement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image: Option<String>,
    /// When present, replaces the full ingredient requirement set
    pub ingredients: Option<Vec<IngredientRequirement>>,
}
