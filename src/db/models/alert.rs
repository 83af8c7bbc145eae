//! Inventory alert model

use super::ingredient::Ingredient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LowStock,
    NearExpiry,
    RapidDepletion,
    ConsumptionAnomaly,
    PredictiveShortage,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "LOW_STOCK",
            AlertType::NearExpiry => "NEAR_EXPIRY",
            AlertType::RapidDepletion => "RAPID_DEPLETION",
            AlertType::ConsumptionAnomaly => "CONSUMPTION_ANOMALY",
            AlertType::PredictiveShortage => "PREDICTIVE_SHORTAGE",
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW_STOCK" => Ok(AlertType::LowStock),
            "NEAR_EXPIRY" => Ok(AlertType::NearExpiry),
            "RAPID_DEPLETION" => Ok(AlertType::RapidDepletion),
            "CONSUMPTION_ANOMALY" => Ok(AlertType::ConsumptionAnomaly),
            "PREDICTIVE_SHORTAGE" => Ok(AlertType::PredictiveShortage),
            other => Err(format!("Unknown alert type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(AlertSeverity::Low),
            "MEDIUM" => Ok(AlertSeverity::Medium),
            "HIGH" => Ok(AlertSeverity::High),
            "CRITICAL" => Ok(AlertSeverity::Critical),
            other => Err(format!("Unknown alert severity: {other}")),
        }
    }
}

/// A generated inventory alert
///
/// Mutated only via mark-as-read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub ingredient_id: Option<String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient: Option<Ingredient>,
}

/// An alert about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub ingredient_id: Option<String>,
}
