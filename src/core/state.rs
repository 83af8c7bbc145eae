//! Server state
//!
//! Every port and service is constructed exactly once here and handed out
//! by reference, no global singletons. `ServerState` is `Clone` (all
//! fields are pools, `Arc`s or cheap handles) and doubles as the axum
//! state.

use std::sync::Arc;
use std::time::Duration;

use crate::ai::{GeminiModel, SuggestionService, TextModel};
use crate::cache::{self, CacheStore};
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{
    AlertRepository, FoodItemRepository, IngredientRepository, OrderRepository,
};
use crate::services::{CatalogService, InventoryService, OrderService};

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub cache: Arc<dyn CacheStore>,
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub orders: OrderService,
    pub suggestions: Arc<SuggestionService>,
}

impl ServerState {
    /// Initialize in dependency order: database, cache backend, model,
    /// then the services wired on top of them
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        // 1. Database
        let db = DbService::new(&config.database_path).await?;
        let pool = db.pool.clone();

        // 2. Cache backend (config-selected)
        let cache = cache::connect(&config.cache_backend, &config.redis_url).await?;

        // 3. Repositories
        let foods = FoodItemRepository::new(pool.clone());
        let ingredients = IngredientRepository::new(pool.clone());
        let orders_repo = OrderRepository::new(pool.clone());
        let alerts = AlertRepository::new(pool.clone());

        // 4. Suggestion gateway; without an API key every suggestion falls
        //    back deterministically
        let model: Option<Arc<dyn TextModel>> = match &config.gemini_api_key {
            Some(key) => {
                tracing::info!(model = %config.gemini_model, "Suggestion model enabled");
                Some(Arc::new(GeminiModel::new(key.clone(), config.gemini_model.clone())))
            }
            None => {
                tracing::info!("GEMINI_API_KEY not set, suggestion fallbacks only");
                None
            }
        };
        let suggestions = Arc::new(SuggestionService::new(
            foods.clone(),
            orders_repo.clone(),
            ingredients.clone(),
            alerts.clone(),
            cache.clone(),
            model,
        ));

        // 5. Services
        let catalog = CatalogService::new(foods, cache.clone());
        let inventory = InventoryService::new(ingredients.clone(), alerts, cache.clone());
        let orders = OrderService::new(
            pool,
            catalog.clone(),
            ingredients,
            orders_repo,
            cache.clone(),
            Some(suggestions.clone()),
            Duration::from_millis(config.order_tx_timeout_ms),
        );

        Ok(Self {
            config: config.clone(),
            db,
            cache,
            catalog,
            inventory,
            orders,
            suggestions,
        })
    }
}
