//! Order Pipeline
//!
//! The core of the system. Checkout runs a small state machine:
//!
//! ```text
//! VALIDATING -> RESERVING -> COMMITTING -> COMMITTED
//!      |             |            |
//!      +-- REJECTED  +-- REJECTED +-- FAILED
//! ```
//!
//! - VALIDATING: reject empty carts and malformed lines, snapshot the
//!   total, resolve every food item through the catalog (batch,
//!   cache-first), and fold the cart into aggregate ingredient deductions.
//! - RESERVING: advisory stock pre-check. This is read-then-decide and is
//!   NOT race-free under concurrent orders; the storage-layer decrement in
//!   the commit step is the only authoritative update, and stock that goes
//!   negative there is flagged CRITICAL rather than rejected.
//! - COMMITTING: one transaction under a bounded timeout. The order row,
//!   all order items, every atomic stock decrement, and the batch of
//!   low-stock alerts commit together or not at all.
//! - COMMITTED: invalidate the paginated orders cache and the inventory
//!   dashboard, then fire the post-order screening hook without awaiting
//!   it.
//!
//! Commit failures are not retried here: without the caller's idempotency
//! key a retry could create a duplicate order. With a key, retries are
//! safe and resolve to the original order id.

use crate::ai::SuggestionService;
use crate::cache::{self, CacheStore, keys};
use crate::db::models::{
    AlertDraft, CartLine, FoodItem, Order, OrderPage, OrderStatus, Pagination,
};
use crate::db::repository::order::OrderItemInsert;
use crate::db::repository::{
    AlertRepository, IngredientRepository, OrderRepository, RepoError, RepoResult,
};
use crate::services::catalog::CatalogService;
use crate::services::inventory::low_stock_alert;
use crate::utils::AppError;
use crate::utils::units::{money_to_cents, qty_to_milli};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

const ORDERS_TTL: Duration = Duration::from_secs(300);
const MAX_LINE_QUANTITY: i64 = 9999;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for food item {food_item_id}")]
    InvalidQuantity { food_item_id: String, quantity: i64 },

    #[error("Invalid price for food item {food_item_id}: {reason}")]
    InvalidPrice {
        food_item_id: String,
        reason: String,
    },

    #[error("Food item {0} not found")]
    FoodItemNotFound(String),

    #[error("Insufficient inventory for {name}. Required: {required}, Available: {available}")]
    InsufficientInventory {
        name: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Order transaction timed out")]
    Timeout,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepoError> for OrderError {
    fn from(err: RepoError) -> Self {
        OrderError::Storage(err.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::EmptyCart
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. } => AppError::Validation(err.to_string()),
            OrderError::FoodItemNotFound(_) => AppError::NotFound(err.to_string()),
            OrderError::InsufficientInventory { .. } => AppError::BusinessRule(err.to_string()),
            OrderError::Timeout => AppError::Internal(err.to_string()),
            OrderError::Storage(msg) => AppError::Database(msg.clone()),
        }
    }
}

/// Aggregate stock requirement of one ingredient for an entire order
#[derive(Debug, Clone, PartialEq)]
pub struct Deduction {
    pub ingredient_id: String,
    pub name: String,
    pub unit: String,
    pub required: Decimal,
}

/// Fold the cart into per-ingredient deductions:
/// `required[ingredient] = Σ qty_required × line quantity` across every
/// line of every food item. Pure in-memory, no side effects. The result is
/// sorted by ingredient name so processing order (and any error surfaced
/// from it) is deterministic.
pub(crate) fn aggregate_deductions(
    lines: &[CartLine],
    foods: &HashMap<String, FoodItem>,
) -> Result<Vec<Deduction>, OrderError> {
    let mut by_ingredient: HashMap<String, Deduction> = HashMap::new();

    for line in lines {
        let food = foods
            .get(&line.food_item_id)
            .ok_or_else(|| OrderError::FoodItemNotFound(line.food_item_id.clone()))?;
        for requirement in &food.ingredients {
            let ingredient = &requirement.ingredient;
            let amount = requirement.qty_required * Decimal::from(line.quantity);
            by_ingredient
                .entry(ingredient.id.clone())
                .and_modify(|d| d.required += amount)
                .or_insert_with(|| Deduction {
                    ingredient_id: ingredient.id.clone(),
                    name: ingredient.name.clone(),
                    unit: ingredient.unit.clone(),
                    required: amount,
                });
        }
    }

    let mut deductions: Vec<Deduction> = by_ingredient.into_values().collect();
    deductions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(deductions)
}

#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    catalog: CatalogService,
    ingredients: IngredientRepository,
    orders: OrderRepository,
    cache: Arc<dyn CacheStore>,
    /// Post-order screening hook; `None` disables it (tests)
    suggestions: Option<Arc<SuggestionService>>,
    tx_timeout: Duration,
}

impl OrderService {
    pub fn new(
        pool: SqlitePool,
        catalog: CatalogService,
        ingredients: IngredientRepository,
        orders: OrderRepository,
        cache: Arc<dyn CacheStore>,
        suggestions: Option<Arc<SuggestionService>>,
        tx_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            catalog,
            ingredients,
            orders,
            cache,
            suggestions,
            tx_timeout,
        }
    }

    /// Place an order for the given cart lines. Returns the order id (the
    /// original one when `idempotency_key` has been seen before).
    pub async fn create_order(
        &self,
        lines: &[CartLine],
        idempotency_key: Option<&str>,
    ) -> Result<String, OrderError> {
        let started = Instant::now();

        // ========== VALIDATING ==========
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let mut total_cents: i64 = 0;
        let mut items: Vec<OrderItemInsert> = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 || line.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::InvalidQuantity {
                    food_item_id: line.food_item_id.clone(),
                    quantity: line.quantity,
                });
            }
            if line.price < Decimal::ZERO {
                return Err(OrderError::InvalidPrice {
                    food_item_id: line.food_item_id.clone(),
                    reason: "price must be non-negative".into(),
                });
            }
            let price_cents =
                money_to_cents(line.price, "price").map_err(|e| OrderError::InvalidPrice {
                    food_item_id: line.food_item_id.clone(),
                    reason: e.to_string(),
                })?;
            total_cents += price_cents * line.quantity;
            items.push(OrderItemInsert {
                id: uuid::Uuid::new_v4().to_string(),
                food_item_id: line.food_item_id.clone(),
                quantity: line.quantity,
                price_cents,
            });
        }

        // Idempotent replay: a known key resolves to the original order
        if let Some(key) = idempotency_key
            && let Some(existing) = self.orders.find_id_by_idempotency_key(key).await?
        {
            tracing::warn!(
                idempotency_key = key,
                order_id = %existing,
                "Duplicate order detected, returning original"
            );
            return Ok(existing);
        }

        // Resolve every food item in one batch; any unknown id aborts the
        // whole order
        let ids: Vec<String> = lines.iter().map(|l| l.food_item_id.clone()).collect();
        let foods: HashMap<String, FoodItem> = self
            .catalog
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();
        let deductions = aggregate_deductions(lines, &foods)?;

        // ========== RESERVING ==========
        // Advisory pre-check only: concurrent orders may still drive stock
        // negative between this read and the decrement below.
        for deduction in &deductions {
            let current = self
                .ingredients
                .find_by_id(&deduction.ingredient_id)
                .await?
                .ok_or_else(|| {
                    OrderError::Storage(format!(
                        "Ingredient {} not found",
                        deduction.ingredient_id
                    ))
                })?;
            if current.quantity < deduction.required {
                return Err(OrderError::InsufficientInventory {
                    name: current.name,
                    required: deduction.required,
                    available: current.quantity,
                });
            }
        }

        // ========== COMMITTING ==========
        let order_id = uuid::Uuid::new_v4().to_string();
        let commit = self.commit(&order_id, total_cents, idempotency_key, &items, &deductions);
        match tokio::time::timeout(self.tx_timeout, commit).await {
            Ok(Ok(())) => {}
            Ok(Err(RepoError::Duplicate(_))) if idempotency_key.is_some() => {
                // Lost the race against a concurrent retry with the same
                // key; resolve to the order that won
                let key = idempotency_key.unwrap_or_default();
                if let Some(existing) = self.orders.find_id_by_idempotency_key(key).await? {
                    tracing::warn!(
                        idempotency_key = key,
                        order_id = %existing,
                        "Concurrent duplicate order, returning original"
                    );
                    return Ok(existing);
                }
                return Err(OrderError::Storage("Duplicate order".into()));
            }
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    items = lines.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Order creation failed"
                );
                return Err(e.into());
            }
            Err(_) => {
                // The timed-out future is dropped, which rolls the
                // transaction back in full
                tracing::error!(
                    timeout_ms = self.tx_timeout.as_millis() as u64,
                    items = lines.len(),
                    "Order transaction timed out"
                );
                return Err(OrderError::Timeout);
            }
        }

        // ========== COMMITTED ==========
        // New orders shift every page and the stock levels changed
        cache::invalidate_pattern(&*self.cache, keys::ORDERS_PATTERN).await;
        cache::invalidate(&*self.cache, &[&keys::inventory_dashboard()]).await;

        tracing::info!(
            order_id = %order_id,
            items = lines.len(),
            total_cents,
            duration_ms = started.elapsed().as_millis() as u64,
            "Order committed"
        );

        // Post-order screening runs detached; its failure never reaches
        // the customer
        if let Some(suggestions) = &self.suggestions {
            let service = suggestions.clone();
            let screened_order = order_id.clone();
            tokio::spawn(async move {
                service.post_order_screening(&screened_order).await;
            });
        }

        Ok(order_id)
    }

    /// The transactional step: order + items + decrements + alerts, all or
    /// nothing
    async fn commit(
        &self,
        order_id: &str,
        total_cents: i64,
        idempotency_key: Option<&str>,
        items: &[OrderItemInsert],
        deductions: &[Deduction],
    ) -> RepoResult<()> {
        let tx_started = Instant::now();
        let mut tx = self.pool.begin().await?;
        tracing::debug!(order_id, "Transaction start");

        OrderRepository::create_with_items(
            &mut tx,
            order_id,
            total_cents,
            OrderStatus::Completed,
            idempotency_key,
            items,
        )
        .await?;

        let mut alerts: Vec<AlertDraft> = Vec::new();
        for deduction in deductions {
            let delta = qty_to_milli(deduction.required, "deduction")?;
            let post =
                IngredientRepository::adjust_stock_on(&mut tx, &deduction.ingredient_id, -delta)
                    .await?;
            if let Some(alert) = low_stock_alert(&post) {
                alerts.push(alert);
            }
        }
        AlertRepository::create_many_on(&mut tx, &alerts).await?;

        tx.commit().await?;
        tracing::info!(
            order_id,
            low_stock_alerts = alerts.len(),
            duration_ms = tx_started.elapsed().as_millis() as u64,
            "Transaction commit"
        );
        Ok(())
    }

    /// One page of orders, newest first, with a pagination summary; cached
    /// per `(page, page_size)` and bulk-invalidated on every commit
    pub async fn get_orders(&self, page: u32, page_size: u32) -> RepoResult<OrderPage> {
        let started = Instant::now();
        let page = page.max(1);
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        let key = keys::orders_page(page, page_size);

        if let Some(cached) = cache::get_json::<OrderPage>(&*self.cache, &key).await {
            tracing::debug!(page, page_size, "Orders served from cache");
            return Ok(cached);
        }

        let total = self.orders.count().await?;
        let offset = (page as i64 - 1) * page_size as i64;
        let orders = self.orders.find_page(page_size as i64, offset).await?;

        let result = OrderPage {
            orders,
            pagination: Pagination {
                page,
                page_size,
                total,
                total_pages: total.div_ceil(page_size as u64),
            },
        };
        cache::put_json(&*self.cache, &key, &result, ORDERS_TTL).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(page, page_size, total, duration_ms, "Orders page fetched");
        if duration_ms > 1000 {
            tracing::warn!(page, page_size, duration_ms, "Slow orders query");
        }
        Ok(result)
    }

    pub async fn get_order_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        self.orders.find_by_id_with_items(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::DbService;
    use crate::db::models::{FoodItemCreate, IngredientCreate, IngredientRequirement};
    use crate::db::repository::FoodItemRepository;

    struct Fixture {
        service: OrderService,
        orders: OrderRepository,
        ingredients: IngredientRepository,
        alerts: AlertRepository,
        foods: FoodItemRepository,
        cache: Arc<MemoryCache>,
    }

    async fn setup() -> Fixture {
        let db = DbService::new_in_memory().await.unwrap();
        let cache = Arc::new(MemoryCache::new());
        let foods = FoodItemRepository::new(db.pool.clone());
        let ingredients = IngredientRepository::new(db.pool.clone());
        let orders = OrderRepository::new(db.pool.clone());
        let alerts = AlertRepository::new(db.pool.clone());
        let catalog = CatalogService::new(foods.clone(), cache.clone());
        let service = OrderService::new(
            db.pool.clone(),
            catalog,
            ingredients.clone(),
            orders.clone(),
            cache.clone(),
            None,
            Duration::from_secs(10),
        );
        Fixture {
            service,
            orders,
            ingredients,
            alerts,
            foods,
            cache,
        }
    }

    async fn seed_ingredient(fx: &Fixture, name: &str, qty_milli: i64, thr_milli: i64) -> String {
        fx.ingredients
            .create(IngredientCreate {
                name: name.into(),
                quantity: Decimal::new(qty_milli, 3),
                threshold: Decimal::new(thr_milli, 3),
                unit: "kg".into(),
                expiry_date: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_food(
        fx: &Fixture,
        name: &str,
        price_cents: i64,
        requirements: &[(&str, i64)], // (ingredient_id, qty_required_milli)
    ) -> String {
        fx.foods
            .create(FoodItemCreate {
                name: name.into(),
                price: Decimal::new(price_cents, 2),
                description: String::new(),
                image: String::new(),
                ingredients: requirements
                    .iter()
                    .map(|(id, milli)| IngredientRequirement {
                        ingredient_id: (*id).to_string(),
                        qty_required: Decimal::new(*milli, 3),
                    })
                    .collect(),
            })
            .await
            .unwrap()
            .id
    }

    fn line(food_id: &str, quantity: i64, price_cents: i64) -> CartLine {
        CartLine {
            food_item_id: food_id.into(),
            quantity,
            price: Decimal::new(price_cents, 2),
        }
    }

    // ========== Pure deduction fold ==========

    #[tokio::test]
    async fn deductions_accumulate_across_lines_and_foods() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 20_000).await;
        let chicken = seed_ingredient(&fx, "Chicken", 50_000, 10_000).await;
        let biryani =
            seed_food(&fx, "Chicken Biryani", 39999, &[(&rice, 300), (&chicken, 200)]).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 250)]).await;

        let foods: HashMap<String, FoodItem> = fx
            .service
            .catalog
            .get_by_ids(&[biryani.clone(), pulao.clone()])
            .await
            .unwrap()
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();

        // Two lines of the same food plus one of another sharing rice
        let lines = vec![
            line(&biryani, 2, 39999),
            line(&biryani, 1, 39999),
            line(&pulao, 4, 24999),
        ];
        let deductions = aggregate_deductions(&lines, &foods).unwrap();

        assert_eq!(deductions.len(), 2);
        // Sorted by name: Basmati Rice, Chicken
        assert_eq!(deductions[0].name, "Basmati Rice");
        // 3 × 0.3 + 4 × 0.25 = 1.9
        assert_eq!(deductions[0].required, Decimal::new(1_900, 3));
        assert_eq!(deductions[1].name, "Chicken");
        // 3 × 0.2 = 0.6
        assert_eq!(deductions[1].required, Decimal::new(600, 3));
    }

    #[tokio::test]
    async fn deductions_reject_unknown_food() {
        let lines = vec![line("ghost", 1, 100)];
        let err = aggregate_deductions(&lines, &HashMap::new()).unwrap_err();
        assert!(matches!(err, OrderError::FoodItemNotFound(id) if id == "ghost"));
    }

    // ========== Pipeline ==========

    #[tokio::test]
    async fn happy_path_creates_order_and_deducts_exactly() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 20_000).await;
        let chicken = seed_ingredient(&fx, "Chicken", 50_000, 10_000).await;
        let biryani =
            seed_food(&fx, "Chicken Biryani", 39999, &[(&rice, 300), (&chicken, 200)]).await;

        let order_id = fx
            .service
            .create_order(&[line(&biryani, 2, 39999)], None)
            .await
            .unwrap();

        let order = fx
            .orders
            .find_by_id_with_items(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.total, Decimal::new(79998, 2)); // 2 × 399.99
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].price, Decimal::new(39999, 2));
        assert_eq!(
            order.items[0].food_item.as_ref().unwrap().name,
            "Chicken Biryani"
        );

        // Conservation: new = old - deduction, exactly
        let rice_after = fx.ingredients.find_by_id(&rice).await.unwrap().unwrap();
        assert_eq!(rice_after.quantity, Decimal::new(99_400, 3)); // 100 - 2×0.3
        let chicken_after = fx.ingredients.find_by_id(&chicken).await.unwrap().unwrap();
        assert_eq!(chicken_after.quantity, Decimal::new(49_600, 3)); // 50 - 2×0.2

        // Everything stayed above threshold: no alerts
        assert!(fx.alerts.find_by_read(false, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_orders_never_drift() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 1_000).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 301)]).await;

        for _ in 0..10 {
            fx.service
                .create_order(&[line(&pulao, 1, 24999)], None)
                .await
                .unwrap();
        }
        // 100 - 10 × 0.301 = 96.99, bit-exact
        let after = fx.ingredients.find_by_id(&rice).await.unwrap().unwrap();
        assert_eq!(after.quantity, Decimal::new(96_990, 3));
    }

    #[tokio::test]
    async fn insufficient_stock_rejected_before_any_write() {
        let fx = setup().await;
        let paneer = seed_ingredient(&fx, "Paneer", 500, 8_000).await; // 0.5 on hand
        let tikka = seed_food(&fx, "Paneer Tikka", 29999, &[(&paneer, 600)]).await; // needs 0.6

        let err = fx
            .service
            .create_order(&[line(&tikka, 1, 29999)], None)
            .await
            .unwrap_err();
        match err {
            OrderError::InsufficientInventory {
                name,
                required,
                available,
            } => {
                assert_eq!(name, "Paneer");
                assert_eq!(required, Decimal::new(600, 3));
                assert_eq!(available, Decimal::new(500, 3));
            }
            other => panic!("expected InsufficientInventory, got {other:?}"),
        }

        // Atomicity: nothing was created or mutated
        assert_eq!(fx.orders.count().await.unwrap(), 0);
        assert!(fx.alerts.find_by_read(false, 50).await.unwrap().is_empty());
        let untouched = fx.ingredients.find_by_id(&paneer).await.unwrap().unwrap();
        assert_eq!(untouched.quantity, Decimal::new(500, 3));
    }

    #[tokio::test]
    async fn unknown_food_rejects_whole_order() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 20_000).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 250)]).await;

        let err = fx
            .service
            .create_order(&[line(&pulao, 1, 24999), line("missing", 1, 100)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::FoodItemNotFound(id) if id == "missing"));

        assert_eq!(fx.orders.count().await.unwrap(), 0);
        let untouched = fx.ingredients.find_by_id(&rice).await.unwrap().unwrap();
        assert_eq!(untouched.quantity, Decimal::new(100_000, 3));
    }

    #[tokio::test]
    async fn empty_and_malformed_carts_rejected() {
        let fx = setup().await;
        assert!(matches!(
            fx.service.create_order(&[], None).await.unwrap_err(),
            OrderError::EmptyCart
        ));
        assert!(matches!(
            fx.service
                .create_order(&[line("any", 0, 100)], None)
                .await
                .unwrap_err(),
            OrderError::InvalidQuantity { .. }
        ));
        // Sub-cent price
        let bad_price = CartLine {
            food_item_id: "any".into(),
            quantity: 1,
            price: Decimal::new(19_999, 3), // 19.999
        };
        assert!(matches!(
            fx.service.create_order(&[bad_price], None).await.unwrap_err(),
            OrderError::InvalidPrice { .. }
        ));
        assert_eq!(fx.orders.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn threshold_crossing_raises_one_high_alert() {
        let fx = setup().await;
        // Quantity 10, threshold 8; deducting 3 lands at 7 < 8
        let tomato = seed_ingredient(&fx, "Tomato", 10_000, 8_000).await;
        let soup = seed_food(&fx, "Tomato Soup", 9999, &[(&tomato, 3_000)]).await;

        fx.service
            .create_order(&[line(&soup, 1, 9999)], None)
            .await
            .unwrap();

        let alerts = fx.alerts.find_by_read(false, 50).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, crate::db::models::AlertType::LowStock);
        assert_eq!(alerts[0].severity, crate::db::models::AlertSeverity::High);
        assert_eq!(alerts[0].title, "Low Stock: Tomato");
        assert_eq!(alerts[0].ingredient_id.as_deref(), Some(tomato.as_str()));
    }

    #[tokio::test]
    async fn landing_exactly_on_threshold_raises_no_alert() {
        let fx = setup().await;
        // Quantity 10, threshold 8; deducting 2 lands exactly at 8
        let onion = seed_ingredient(&fx, "Onion", 10_000, 8_000).await;
        let bhaji = seed_food(&fx, "Onion Bhaji", 7999, &[(&onion, 2_000)]).await;

        fx.service
            .create_order(&[line(&bhaji, 1, 7999)], None)
            .await
            .unwrap();

        assert!(fx.alerts.find_by_read(false, 50).await.unwrap().is_empty());
        let after = fx.ingredients.find_by_id(&onion).await.unwrap().unwrap();
        assert_eq!(after.quantity, Decimal::new(8_000, 3));
    }

    #[tokio::test]
    async fn exhausting_stock_is_critical() {
        let fx = setup().await;
        let ghee = seed_ingredient(&fx, "Ghee", 1_000, 3_000).await;
        let halwa = seed_food(&fx, "Halwa", 14999, &[(&ghee, 1_000)]).await;

        fx.service
            .create_order(&[line(&halwa, 1, 14999)], None)
            .await
            .unwrap();

        let alerts = fx.alerts.find_by_read(false, 50).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].severity,
            crate::db::models::AlertSeverity::Critical
        );
    }

    #[tokio::test]
    async fn idempotency_key_replays_original_order() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 20_000).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 250)]).await;
        let cart = [line(&pulao, 2, 24999)];

        let first = fx
            .service
            .create_order(&cart, Some("retry-123"))
            .await
            .unwrap();
        let second = fx
            .service
            .create_order(&cart, Some("retry-123"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.orders.count().await.unwrap(), 1);
        // Stock was deducted exactly once
        let after = fx.ingredients.find_by_id(&rice).await.unwrap().unwrap();
        assert_eq!(after.quantity, Decimal::new(99_500, 3));

        // A different key is a different order
        let third = fx
            .service
            .create_order(&cart, Some("retry-456"))
            .await
            .unwrap();
        assert_ne!(first, third);
        assert_eq!(fx.orders.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pagination_partitions_orders_exactly() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 1_000).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 100)]).await;

        for _ in 0..5 {
            fx.service
                .create_order(&[line(&pulao, 1, 24999)], None)
                .await
                .unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        for page in 1..=3u32 {
            let result = fx.service.get_orders(page, 2).await.unwrap();
            assert_eq!(result.pagination.total, 5);
            assert_eq!(result.pagination.total_pages, 3);
            assert_eq!(result.pagination.page, page);
            let expected_len = if page == 3 { 1 } else { 2 };
            assert_eq!(result.orders.len(), expected_len);
            for order in &result.orders {
                assert!(seen.insert(order.id.clone()), "duplicate across pages");
                assert_eq!(order.items.len(), 1);
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn commit_invalidates_order_pages() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 1_000).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 100)]).await;

        fx.service
            .create_order(&[line(&pulao, 1, 24999)], None)
            .await
            .unwrap();
        let before = fx.service.get_orders(1, 10).await.unwrap();
        assert_eq!(before.pagination.total, 1);
        assert!(
            fx.cache
                .get(&keys::orders_page(1, 10))
                .await
                .unwrap()
                .is_some()
        );

        // A new commit must purge every cached page
        fx.service
            .create_order(&[line(&pulao, 1, 24999)], None)
            .await
            .unwrap();
        let after = fx.service.get_orders(1, 10).await.unwrap();
        assert_eq!(after.pagination.total, 2);
    }

    #[tokio::test]
    async fn get_order_by_id_round_trips() {
        let fx = setup().await;
        let rice = seed_ingredient(&fx, "Basmati Rice", 100_000, 1_000).await;
        let pulao = seed_food(&fx, "Veg Pulao", 24999, &[(&rice, 100)]).await;

        let id = fx
            .service
            .create_order(&[line(&pulao, 3, 24999)], None)
            .await
            .unwrap();
        let order = fx.service.get_order_by_id(&id).await.unwrap().unwrap();
        assert_eq!(order.total, Decimal::new(74997, 2));
        assert!(fx.service.get_order_by_id("missing").await.unwrap().is_none());
    }
}
