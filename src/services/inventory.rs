//! Inventory Ledger
//!
//! Owns ingredient stock levels, the low-stock policy and alert records.
//! Stock is only ever mutated through the repository's atomic adjustment;
//! this service layers caching, invalidation and the alerting rules on top.

use crate::cache::{self, CacheStore, keys};
use crate::db::models::{AiAlert, AlertDraft, AlertSeverity, AlertType, Ingredient, IngredientCreate};
use crate::db::repository::{AlertRepository, IngredientRepository, RepoResult};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const INGREDIENTS_TTL: Duration = Duration::from_secs(300);
/// Alerts are write-heavy; keep them barely cached
const ALERTS_TTL: Duration = Duration::from_secs(60);
const DASHBOARD_TTL: Duration = Duration::from_secs(120);
const ALERTS_LIMIT: i64 = 50;

/// Low-stock policy, shared by the order pipeline and the on-demand
/// analysis: an alert is due iff the quantity fell below the threshold,
/// CRITICAL when stock is exhausted (or negative), HIGH otherwise.
pub fn low_stock_alert(ingredient: &Ingredient) -> Option<AlertDraft> {
    if !ingredient.is_low_stock() {
        return None;
    }
    let severity = if ingredient.quantity <= Decimal::ZERO {
        AlertSeverity::Critical
    } else {
        AlertSeverity::High
    };
    Some(AlertDraft {
        alert_type: AlertType::LowStock,
        severity,
        title: format!("Low Stock: {}", ingredient.name),
        message: format!(
            "{} is below threshold ({}{} remaining, threshold: {}{})",
            ingredient.name,
            ingredient.quantity,
            ingredient.unit,
            ingredient.threshold,
            ingredient.unit
        ),
        ingredient_id: Some(ingredient.id.clone()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total: u64,
    pub low_stock: u64,
    pub near_expiry: u64,
    pub total_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDashboard {
    pub ingredients: Vec<Ingredient>,
    pub stats: InventoryStats,
}

#[derive(Clone)]
pub struct InventoryService {
    ingredients: IngredientRepository,
    alerts: AlertRepository,
    cache: Arc<dyn CacheStore>,
}

impl InventoryService {
    pub fn new(
        ingredients: IngredientRepository,
        alerts: AlertRepository,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            ingredients,
            alerts,
            cache,
        }
    }

    /// All ingredients, name ascending, cached
    pub async fn get_ingredients(&self) -> RepoResult<Vec<Ingredient>> {
        let key = keys::ingredients();
        if let Some(cached) = cache::get_json::<Vec<Ingredient>>(&*self.cache, &key).await {
            tracing::debug!("Ingredients served from cache");
            return Ok(cached);
        }
        let list = self.ingredients.find_all().await?;
        cache::put_json(&*self.cache, &key, &list, INGREDIENTS_TTL).await;
        Ok(list)
    }

    /// One ingredient, cached per id. The order pipeline deliberately does
    /// NOT use this: its stock pre-check reads the repository directly so
    /// it never decides on a stale cached quantity.
    pub async fn get_ingredient(&self, id: &str) -> RepoResult<Option<Ingredient>> {
        let key = keys::ingredient(id);
        if let Some(cached) = cache::get_json::<Ingredient>(&*self.cache, &key).await {
            return Ok(Some(cached));
        }
        let ingredient = self.ingredients.find_by_id(id).await?;
        if let Some(ingredient) = &ingredient {
            cache::put_json(&*self.cache, &key, ingredient, INGREDIENTS_TTL).await;
        }
        Ok(ingredient)
    }

    /// Alerts filtered by read state, newest first, capped at 50
    pub async fn get_alerts(&self, is_read: bool) -> RepoResult<Vec<AiAlert>> {
        let key = keys::alerts(is_read);
        if let Some(cached) = cache::get_json::<Vec<AiAlert>>(&*self.cache, &key).await {
            tracing::debug!(is_read, "Alerts served from cache");
            return Ok(cached);
        }
        let list = self.alerts.find_by_read(is_read, ALERTS_LIMIT).await?;
        cache::put_json(&*self.cache, &key, &list, ALERTS_TTL).await;
        Ok(list)
    }

    /// Idempotent. Dismissing one alert shifts both partitions, so both
    /// cache entries are dropped.
    pub async fn mark_alert_read(&self, alert_id: &str) -> RepoResult<()> {
        self.alerts.mark_read(alert_id).await?;
        cache::invalidate(
            &*self.cache,
            &[&keys::alerts(false), &keys::alerts(true)],
        )
        .await;
        Ok(())
    }

    /// Atomic decrement returning the post-update row
    pub async fn decrement_stock(&self, id: &str, amount: Decimal) -> RepoResult<Ingredient> {
        self.ingredients.decrement_stock(id, amount).await
    }

    /// Atomic increment returning the post-update row
    pub async fn increment_stock(&self, id: &str, amount: Decimal) -> RepoResult<Ingredient> {
        self.ingredients.increment_stock(id, amount).await
    }

    /// Ingredients expiring within the window, soonest first (uncached)
    pub async fn get_near_expiry(&self, window_days: i64) -> RepoResult<Vec<Ingredient>> {
        self.ingredients.near_expiry(window_days).await
    }

    /// Dashboard aggregates, cached briefly
    pub async fn get_dashboard(&self) -> RepoResult<InventoryDashboard> {
        let key = keys::inventory_dashboard();
        if let Some(cached) = cache::get_json::<InventoryDashboard>(&*self.cache, &key).await {
            tracing::debug!("Inventory dashboard served from cache");
            return Ok(cached);
        }

        let ingredients = self.ingredients.find_all().await?;
        let now = Utc::now();
        let low_stock = ingredients.iter().filter(|i| i.is_low_stock()).count() as u64;
        let near_expiry = ingredients
            .iter()
            .filter(|i| match i.expiry_date {
                Some(expiry) => expiry >= now && expiry <= now + chrono::Duration::days(7),
                None => false,
            })
            .count() as u64;
        let total_quantity: Decimal = ingredients.iter().map(|i| i.quantity).sum();

        let dashboard = InventoryDashboard {
            stats: InventoryStats {
                total: ingredients.len() as u64,
                low_stock,
                near_expiry,
                total_quantity,
            },
            ingredients,
        };
        cache::put_json(&*self.cache, &key, &dashboard, DASHBOARD_TTL).await;
        Ok(dashboard)
    }

    /// Register a new ingredient (admin); invalidates the ingredient caches
    pub async fn create_ingredient(&self, data: IngredientCreate) -> RepoResult<Ingredient> {
        let ingredient = self.ingredients.create(data).await?;
        cache::invalidate(
            &*self.cache,
            &[&keys::ingredients(), &keys::inventory_dashboard()],
        )
        .await;
        tracing::info!(ingredient_id = %ingredient.id, name = %ingredient.name, "Ingredient created");
        Ok(ingredient)
    }

    /// Admin stock correction; invalidates the ingredient caches
    pub async fn set_quantity(&self, id: &str, quantity: Decimal) -> RepoResult<Ingredient> {
        let ingredient = self.ingredients.set_quantity(id, quantity).await?;
        cache::invalidate(
            &*self.cache,
            &[
                &keys::ingredient(id),
                &keys::ingredients(),
                &keys::inventory_dashboard(),
            ],
        )
        .await;
        tracing::info!(ingredient_id = %id, quantity = %quantity, "Ingredient quantity updated");
        Ok(ingredient)
    }

    /// Batch admin correction, transactional: either every update applies
    /// or none does
    pub async fn batch_set_quantities(
        &self,
        updates: &[(String, Decimal)],
    ) -> RepoResult<Vec<Ingredient>> {
        let updated = self.ingredients.set_quantities(updates).await?;
        let mut stale: Vec<String> = updates
            .iter()
            .map(|(id, _)| keys::ingredient(id))
            .collect();
        stale.push(keys::ingredients());
        stale.push(keys::inventory_dashboard());
        let stale_refs: Vec<&str> = stale.iter().map(String::as_str).collect();
        cache::invalidate(&*self.cache, &stale_refs).await;
        tracing::info!(count = updated.len(), "Batch ingredient update");
        Ok(updated)
    }

    /// On-demand rule-based sweep over the whole ledger, batch-inserting
    /// low-stock and near-expiry alerts. Returns the number of alerts
    /// written.
    pub async fn analyze_inventory(&self) -> RepoResult<u64> {
        let ingredients = self.ingredients.find_all().await?;
        let now = Utc::now();
        let mut drafts: Vec<AlertDraft> = Vec::new();

        for ingredient in &ingredients {
            if let Some(alert) = low_stock_alert(ingredient) {
                drafts.push(alert);
            }
            if let Some(expiry) = ingredient.expiry_date {
                let secs = (expiry - now).num_seconds();
                if secs >= 0 {
                    let days = (secs + 86_399) / 86_400; // ceil to whole days
                    if days <= 3 {
                        drafts.push(AlertDraft {
                            alert_type: AlertType::NearExpiry,
                            severity: if days <= 1 {
                                AlertSeverity::High
                            } else {
                                AlertSeverity::Medium
                            },
                            title: format!("Near Expiry: {}", ingredient.name),
                            message: format!(
                                "{} expires in {} days",
                                ingredient.name, days
                            ),
                            ingredient_id: Some(ingredient.id.clone()),
                        });
                    }
                }
            }
        }

        let created = self.alerts.create_many(&drafts).await?;
        if created > 0 {
            cache::invalidate(
                &*self.cache,
                &[&keys::alerts(false), &keys::alerts(true)],
            )
            .await;
        }
        tracing::info!(alerts_created = created, "Inventory analysis completed");
        Ok(created)
    }
}
