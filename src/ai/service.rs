//! Suggestion service
//!
//! Builds prompts from catalog/order context, interprets model output, and
//! degrades to deterministic fallbacks (first N available items) whenever
//! the model is absent, fails, or answers with something unusable.

use super::{AiError, Suggestion, TextModel, parse};
use crate::cache::{self, CacheStore, keys};
use crate::db::models::{
    AlertDraft, AlertSeverity, AlertType, FoodItem, FoodItemSummary, Order,
};
use crate::db::repository::{
    AlertRepository, FoodItemRepository, IngredientRepository, OrderRepository, RepoResult,
};
use crate::services::inventory::low_stock_alert;
use chrono::Timelike;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;

const PAIRING_POOL: i64 = 10;
const UPSELL_POOL: i64 = 15;
const MENU_POOL: i64 = 20;

pub struct SuggestionService {
    foods: FoodItemRepository,
    orders: OrderRepository,
    ingredients: IngredientRepository,
    alerts: AlertRepository,
    cache: Arc<dyn CacheStore>,
    model: Option<Arc<dyn TextModel>>,
}

impl SuggestionService {
    pub fn new(
        foods: FoodItemRepository,
        orders: OrderRepository,
        ingredients: IngredientRepository,
        alerts: AlertRepository,
        cache: Arc<dyn CacheStore>,
        model: Option<Arc<dyn TextModel>>,
    ) -> Self {
        Self {
            foods,
            orders,
            ingredients,
            alerts,
            cache,
            model,
        }
    }

    /// One item that pairs well with the given food, or `None` when the
    /// catalog has nothing else to offer
    pub async fn suggest_pairing(&self, food_id: &str) -> Option<Suggestion> {
        let food = match self.foods.find_by_id(food_id).await {
            Ok(Some(food)) => food,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(food_id, error = %e, "Pairing lookup failed");
                return None;
            }
        };
        let candidates = self.candidates(&[food_id.to_string()], PAIRING_POOL).await;
        if candidates.is_empty() {
            return None;
        }

        if let Some(value) = self.generate_json(&pairing_prompt(&food, &candidates)).await
            && let Some(name) = value.get("foodName").and_then(Value::as_str)
            && let Some(pick) = match_food(&candidates, name)
        {
            let reason = value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("This pairs perfectly with your selection!");
            return Some(to_suggestion(pick, reason));
        }

        Some(to_suggestion(
            &candidates[0],
            "This pairs perfectly with your selection!",
        ))
    }

    /// 2-3 items that complement the cart
    pub async fn suggest_upsells(&self, cart_food_ids: &[String]) -> Vec<Suggestion> {
        if cart_food_ids.is_empty() {
            return Vec::new();
        }
        let cart_items = match self.foods.find_by_ids(cart_food_ids).await {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Upsell cart lookup failed");
                return Vec::new();
            }
        };
        let candidates = self.candidates(cart_food_ids, UPSELL_POOL).await;
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut picks = match self
            .generate_json(&upsell_prompt(&cart_items, &candidates))
            .await
        {
            Some(value) => picks_from_value(&value, &candidates, 3, "Perfect addition to your order!"),
            None => Vec::new(),
        };
        if picks.len() < 2 {
            fill_from(&mut picks, &candidates, 3, "Completes your meal perfectly!");
        }
        picks
    }

    /// 3-5 items recommended for the current time of day
    pub async fn suggest_menu(&self) -> Vec<Suggestion> {
        let candidates = self.candidates(&[], MENU_POOL).await;
        if candidates.is_empty() {
            return Vec::new();
        }
        let recent = self.orders.find_page(5, 0).await.unwrap_or_default();

        let mut picks = match self
            .generate_json(&menu_prompt(&candidates, &recent))
            .await
        {
            Some(value) => picks_from_value(&value, &candidates, 5, "Highly recommended!"),
            None => Vec::new(),
        };
        if picks.len() < 3 {
            fill_from(&mut picks, &candidates, 5, "Popular choice!");
        }
        picks
    }

    /// 2-3 items the customer might enjoy on their next visit
    pub async fn suggest_next_order(&self, order_id: &str) -> Vec<Suggestion> {
        let order = match self.orders.find_by_id_with_items(order_id).await {
            Ok(Some(order)) if !order.items.is_empty() => order,
            Ok(_) => return Vec::new(),
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Next-order lookup failed");
                return Vec::new();
            }
        };
        let ordered: Vec<String> = order.items.iter().map(|i| i.food_item_id.clone()).collect();
        let candidates = self.candidates(&ordered, UPSELL_POOL).await;
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut picks = match self
            .generate_json(&next_order_prompt(&order, &candidates))
            .await
        {
            Some(value) => {
                picks_from_value(&value, &candidates, 3, "You might enjoy this next time!")
            }
            None => Vec::new(),
        };
        if picks.len() < 2 {
            fill_from(&mut picks, &candidates, 3, "Try this next time!");
        }
        picks
    }

    /// Fire-and-forget hook invoked after an order commits. Generates
    /// follow-up inventory alerts; every failure is logged and swallowed.
    pub async fn post_order_screening(&self, order_id: &str) {
        if let Err(e) = self.screen_order(order_id).await {
            tracing::warn!(order_id, error = %e, "Post-order screening failed");
        }
    }

    async fn screen_order(&self, order_id: &str) -> RepoResult<()> {
        let Some(order) = self.orders.find_by_id_with_items(order_id).await? else {
            return Ok(());
        };

        let drafts = if self.model.is_some() {
            let food_ids: Vec<String> =
                order.items.iter().map(|i| i.food_item_id.clone()).collect();
            let foods = self.foods.find_by_ids(&food_ids).await?;
            match self.generate_json(&screening_prompt(&order, &foods)).await {
                Some(value) => self.drafts_from_model(&value).await?,
                None => self.rule_based_drafts().await?,
            }
        } else {
            self.rule_based_drafts().await?
        };

        if !drafts.is_empty() {
            let created = self.alerts.create_many(&drafts).await?;
            cache::invalidate(
                &*self.cache,
                &[&keys::alerts(false), &keys::alerts(true)],
            )
            .await;
            tracing::info!(order_id, alerts_created = created, "Post-order screening alerts");
        }
        Ok(())
    }

    /// Fallback screening: the shared low-stock sweep
    async fn rule_based_drafts(&self) -> RepoResult<Vec<AlertDraft>> {
        let ingredients = self.ingredients.find_all().await?;
        Ok(ingredients.iter().filter_map(low_stock_alert).collect())
    }

    async fn drafts_from_model(&self, value: &Value) -> RepoResult<Vec<AlertDraft>> {
        #[derive(Deserialize)]
        struct ModelAlert {
            #[serde(rename = "type")]
            alert_type: String,
            severity: String,
            title: String,
            message: String,
            #[serde(rename = "ingredientName")]
            ingredient_name: Option<String>,
        }

        let Ok(raw) = serde_json::from_value::<Vec<ModelAlert>>(value.clone()) else {
            tracing::warn!("Screening response did not match the alert schema");
            return Ok(Vec::new());
        };

        let mut drafts = Vec::new();
        for alert in raw {
            let (Ok(alert_type), Ok(severity)) = (
                alert.alert_type.parse::<AlertType>(),
                alert.severity.parse::<AlertSeverity>(),
            ) else {
                tracing::debug!(
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    "Skipping alert with unknown enum value"
                );
                continue;
            };
            let ingredient_id = match &alert.ingredient_name {
                Some(name) => self.ingredients.find_by_name(name).await?.map(|i| i.id),
                None => None,
            };
            drafts.push(AlertDraft {
                alert_type,
                severity,
                title: alert.title,
                message: alert.message,
                ingredient_id,
            });
        }
        Ok(drafts)
    }

    /// Candidate pool for suggestions; errors degrade to an empty pool
    async fn candidates(&self, exclude: &[String], limit: i64) -> Vec<FoodItemSummary> {
        match self.foods.find_summaries_excluding(exclude, limit).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load suggestion candidates");
                Vec::new()
            }
        }
    }

    /// Run the model and extract a JSON value; `None` on any failure
    async fn generate_json(&self, prompt: &str) -> Option<Value> {
        let model = self.model.as_ref()?;
        match model.generate(prompt).await {
            Ok(text) => {
                let parsed = parse::extract_json(&text);
                if parsed.is_none() {
                    tracing::warn!("Model response contained no JSON");
                }
                parsed
            }
            Err(AiError::RateLimited) => {
                // Known signature, reduced severity
                tracing::debug!("Suggestion model rate limited, using fallback");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Suggestion model call failed");
                None
            }
        }
    }
}

// ========== Response interpretation ==========

fn to_suggestion(food: &FoodItemSummary, reason: &str) -> Suggestion {
    Suggestion {
        food_id: food.id.clone(),
        name: food.name.clone(),
        reason: reason.to_string(),
        image: food.image.clone(),
        price: food.price,
    }
}

/// Exact (case-insensitive) name match first, then substring
fn match_food<'a>(candidates: &'a [FoodItemSummary], name: &str) -> Option<&'a FoodItemSummary> {
    let wanted = name.to_lowercase();
    candidates
        .iter()
        .find(|f| f.name.to_lowercase() == wanted)
        .or_else(|| {
            candidates
                .iter()
                .find(|f| f.name.to_lowercase().contains(&wanted))
        })
}

/// Interpret a `[{"foodName", "reason"}]` model answer
fn picks_from_value(
    value: &Value,
    candidates: &[FoodItemSummary],
    cap: usize,
    default_reason: &str,
) -> Vec<Suggestion> {
    let entries = match value {
        Value::Array(entries) => entries.clone(),
        other => vec![other.clone()],
    };

    let mut picks: Vec<Suggestion> = Vec::new();
    for entry in entries.iter().take(cap) {
        let Some(name) = entry.get("foodName").and_then(Value::as_str) else {
            continue;
        };
        let Some(food) = match_food(candidates, name) else {
            continue;
        };
        if picks.iter().any(|s| s.food_id == food.id) {
            continue;
        }
        let reason = entry
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or(default_reason);
        picks.push(to_suggestion(food, reason));
    }
    picks
}

/// Top up short pick lists from the candidate pool, skipping duplicates
fn fill_from(
    picks: &mut Vec<Suggestion>,
    candidates: &[FoodItemSummary],
    target: usize,
    reason: &str,
) {
    for food in candidates {
        if picks.len() >= target {
            break;
        }
        if picks.iter().any(|s| s.food_id == food.id) {
            continue;
        }
        picks.push(to_suggestion(food, reason));
    }
}

// ========== Prompts ==========

fn menu_lines(candidates: &[FoodItemSummary]) -> String {
    let mut out = String::new();
    for food in candidates {
        let _ = writeln!(out, "- {}: {} - {}", food.name, food.description, food.price);
    }
    out
}

fn pairing_prompt(food: &FoodItem, candidates: &[FoodItemSummary]) -> String {
    format!(
        "You are a food pairing expert. A customer just selected \"{}\" ({}).\n\n\
         Available food items:\n{}\n\
         Suggest ONE food item that pairs exceptionally well with \"{}\".\n\
         Respond in JSON format:\n\
         {{\"foodName\": \"exact name from available items\", \"reason\": \"brief explanation (max 50 words)\"}}",
        food.name,
        food.description,
        menu_lines(candidates),
        food.name
    )
}

fn upsell_prompt(cart: &[FoodItem], candidates: &[FoodItemSummary]) -> String {
    let mut cart_lines = String::new();
    for item in cart {
        let _ = writeln!(cart_lines, "- {} ({})", item.name, item.description);
    }
    format!(
        "You are a restaurant upselling expert. A customer has these items in their cart:\n{}\n\
         Available items to suggest:\n{}\n\
         Suggest 2-3 items that would complement their cart perfectly.\n\
         Return JSON array:\n\
         [{{\"foodName\": \"exact name from available items\", \"reason\": \"brief reason (max 30 words)\"}}]",
        cart_lines,
        menu_lines(candidates)
    )
}

fn menu_prompt(candidates: &[FoodItemSummary], recent: &[Order]) -> String {
    let hour = chrono::Local::now().hour();
    let time_of_day = if hour < 12 {
        "morning"
    } else if hour < 17 {
        "afternoon"
    } else {
        "evening"
    };
    let mut recent_lines = String::new();
    for order in recent {
        let summary: Vec<String> = order
            .items
            .iter()
            .filter_map(|i| {
                i.food_item
                    .as_ref()
                    .map(|f| format!("{}x {}", i.quantity, f.name))
            })
            .collect();
        let _ = writeln!(recent_lines, "{}", summary.join(", "));
    }
    format!(
        "You are a restaurant recommendation system. Suggest 3-5 items from the menu \
         that are perfect for {time_of_day}.\n\n\
         Available menu items:\n{}\n\
         Recent popular orders:\n{}\n\
         Return JSON array:\n\
         [{{\"foodName\": \"exact name from available items\", \"reason\": \"brief reason (max 25 words)\"}}]",
        menu_lines(candidates),
        recent_lines
    )
}

fn next_order_prompt(order: &Order, candidates: &[FoodItemSummary]) -> String {
    let mut ordered_lines = String::new();
    for item in &order.items {
        if let Some(food) = &item.food_item {
            let _ = writeln!(ordered_lines, "{}x {} ({})", item.quantity, food.name, food.description);
        }
    }
    format!(
        "A customer just ordered:\n{}\n\
         Available items for next order:\n{}\n\
         Suggest 2-3 items they might like for their next order.\n\
         Return JSON array:\n\
         [{{\"foodName\": \"exact name from available items\", \"reason\": \"brief reason (max 30 words)\"}}]",
        ordered_lines,
        menu_lines(candidates)
    )
}

fn screening_prompt(order: &Order, foods: &[FoodItem]) -> String {
    let mut order_lines = String::new();
    for item in &order.items {
        if let Some(food) = &item.food_item {
            let _ = writeln!(order_lines, "{}x {}", item.quantity, food.name);
        }
    }
    let mut usage_lines = String::new();
    for food in foods {
        for requirement in &food.ingredients {
            let ing = &requirement.ingredient;
            let _ = writeln!(
                usage_lines,
                "- {} uses {}{} of {} (current stock: {}{}, threshold: {}{})",
                food.name,
                requirement.qty_required,
                ing.unit,
                ing.name,
                ing.quantity,
                ing.unit,
                ing.threshold,
                ing.unit
            );
        }
    }
    format!(
        "After this order was placed, analyze ingredient impact:\n\n\
         Order items:\n{order_lines}\n\
         Ingredient usage per item:\n{usage_lines}\n\
         Generate alerts if any thresholds are breached or anomalies detected. Return JSON array:\n\
         [{{\"type\": \"LOW_STOCK\" | \"NEAR_EXPIRY\" | \"RAPID_DEPLETION\" | \"CONSUMPTION_ANOMALY\", \
         \"severity\": \"LOW\" | \"MEDIUM\" | \"HIGH\" | \"CRITICAL\", \
         \"title\": \"Alert title\", \"message\": \"Detailed message\", \"ingredientName\": \"ingredient name\"}}]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::DbService;
    use crate::db::models::{FoodItemCreate, IngredientCreate};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    /// Model that always answers with the same text
    struct ScriptedModel(String);

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> crate::ai::AiResult<String> {
            Ok(self.0.clone())
        }
    }

    /// Model that is permanently rate limited
    struct RateLimitedModel;

    #[async_trait]
    impl TextModel for RateLimitedModel {
        async fn generate(&self, _prompt: &str) -> crate::ai::AiResult<String> {
            Err(AiError::RateLimited)
        }
    }

    struct Fixture {
        pool: sqlx::SqlitePool,
        foods: FoodItemRepository,
        ingredients: IngredientRepository,
        alerts: AlertRepository,
        orders: OrderRepository,
        cache: Arc<MemoryCache>,
    }

    async fn fixture() -> Fixture {
        let db = DbService::new_in_memory().await.unwrap();
        Fixture {
            pool: db.pool.clone(),
            foods: FoodItemRepository::new(db.pool.clone()),
            ingredients: IngredientRepository::new(db.pool.clone()),
            alerts: AlertRepository::new(db.pool.clone()),
            orders: OrderRepository::new(db.pool.clone()),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    fn service(fx: &Fixture, model: Option<Arc<dyn TextModel>>) -> SuggestionService {
        SuggestionService::new(
            fx.foods.clone(),
            fx.orders.clone(),
            fx.ingredients.clone(),
            fx.alerts.clone(),
            fx.cache.clone(),
            model,
        )
    }

    async fn seed_foods(fx: &Fixture, names: &[&str]) -> Vec<String> {
        let mut ids = Vec::new();
        for (index, name) in names.iter().enumerate() {
            let item = fx
                .foods
                .create(FoodItemCreate {
                    name: (*name).into(),
                    price: Decimal::new(9999 + index as i64 * 1000, 2),
                    description: format!("{name} description"),
                    image: String::new(),
                    ingredients: Vec::new(),
                })
                .await
                .unwrap();
            ids.push(item.id);
        }
        ids
    }

    #[tokio::test]
    async fn pairing_honors_model_pick() {
        let fx = fixture().await;
        let ids = seed_foods(&fx, &["Dosa", "Lassi", "Samosa"]).await;
        let svc = service(
            &fx,
            Some(Arc::new(ScriptedModel(
                "```json\n{\"foodName\": \"Lassi\", \"reason\": \"Cools the palate\"}\n```".into(),
            ))),
        );

        let suggestion = svc.suggest_pairing(&ids[0]).await.unwrap();
        assert_eq!(suggestion.name, "Lassi");
        assert_eq!(suggestion.reason, "Cools the palate");
        assert_ne!(suggestion.food_id, ids[0]);
    }

    #[tokio::test]
    async fn pairing_falls_back_without_model() {
        let fx = fixture().await;
        let ids = seed_foods(&fx, &["Dosa", "Lassi"]).await;
        let svc = service(&fx, None);

        let suggestion = svc.suggest_pairing(&ids[1]).await.unwrap();
        // Deterministic: first candidate by name, excluding the input
        assert_eq!(suggestion.name, "Dosa");

        assert!(svc.suggest_pairing("missing").await.is_none());
    }

    #[tokio::test]
    async fn rate_limited_model_degrades_to_fallback() {
        let fx = fixture().await;
        let ids = seed_foods(&fx, &["Dosa", "Lassi", "Samosa", "Chai"]).await;
        let svc = service(&fx, Some(Arc::new(RateLimitedModel)));

        assert!(svc.suggest_pairing(&ids[0]).await.is_some());
        let upsells = svc.suggest_upsells(&ids[..1]).await;
        assert_eq!(upsells.len(), 3);
        assert!(upsells.iter().all(|s| s.food_id != ids[0]));
    }

    #[tokio::test]
    async fn upsells_mix_model_picks_with_fill() {
        let fx = fixture().await;
        let ids = seed_foods(&fx, &["Dosa", "Lassi", "Samosa", "Chai"]).await;
        // Model proposes one valid and one unknown item
        let svc = service(
            &fx,
            Some(Arc::new(ScriptedModel(
                "[{\"foodName\": \"Chai\", \"reason\": \"Classic finish\"}, \
                  {\"foodName\": \"Pizza\", \"reason\": \"nope\"}]"
                    .into(),
            ))),
        );

        let upsells = svc.suggest_upsells(&ids[..1]).await;
        assert_eq!(upsells.len(), 3);
        assert_eq!(upsells[0].name, "Chai");
        assert_eq!(upsells[0].reason, "Classic finish");
        // No duplicates, cart item excluded
        let mut names: Vec<&str> = upsells.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[tokio::test]
    async fn menu_suggestions_without_model_are_popular_picks() {
        let fx = fixture().await;
        seed_foods(&fx, &["Dosa", "Lassi", "Samosa", "Chai", "Idli", "Vada"]).await;
        let svc = service(&fx, None);

        let picks = svc.suggest_menu().await;
        assert_eq!(picks.len(), 5);
        assert!(picks.iter().all(|s| s.reason == "Popular choice!"));
    }

    #[tokio::test]
    async fn empty_catalog_yields_no_suggestions() {
        let fx = fixture().await;
        let svc = service(&fx, None);
        assert!(svc.suggest_menu().await.is_empty());
        assert!(svc.suggest_upsells(&["x".into()]).await.is_empty());
        assert!(svc.suggest_next_order("missing").await.is_empty());
    }

    #[tokio::test]
    async fn screening_without_model_runs_low_stock_sweep() {
        let fx = fixture().await;
        let ids = seed_foods(&fx, &["Dosa"]).await;
        fx.ingredients
            .create(IngredientCreate {
                name: "Paneer".into(),
                quantity: Decimal::new(500, 3),
                threshold: Decimal::new(8_000, 3),
                unit: "kg".into(),
                expiry_date: None,
            })
            .await
            .unwrap();

        // A minimal committed order for the hook to inspect
        let mut conn = fx.pool.acquire().await.unwrap();
        OrderRepository::create_with_items(
            conn.as_mut(),
            "order-1",
            9999,
            crate::db::models::OrderStatus::Completed,
            None,
            &[crate::db::repository::order::OrderItemInsert {
                id: "item-1".into(),
                food_item_id: ids[0].clone(),
                quantity: 1,
                price_cents: 9999,
            }],
        )
        .await
        .unwrap();
        drop(conn);

        let svc = service(&fx, None);
        svc.post_order_screening("order-1").await;

        let alerts = fx.alerts.find_by_read(false, 50).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::LowStock);
        assert_eq!(alerts[0].severity, AlertSeverity::High);

        // Unknown order: a clean no-op
        svc.post_order_screening("ghost").await;
        assert_eq!(fx.alerts.find_by_read(false, 50).await.unwrap().len(), 1);
    }
}
