//! Menu Catalog
//!
//! Read-through cached access to food items. The menu changes rarely, so
//! reads are cached for ten minutes; every admin mutation invalidates both
//! the aggregate key and the per-item key.

use crate::cache::{self, CacheStore, keys};
use crate::db::models::{FoodItem, FoodItemCreate, FoodItemUpdate};
use crate::db::repository::{FoodItemRepository, RepoResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Menu entries change infrequently
const FOOD_TTL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct CatalogService {
    foods: FoodItemRepository,
    cache: Arc<dyn CacheStore>,
}

impl CatalogService {
    pub fn new(foods: FoodItemRepository, cache: Arc<dyn CacheStore>) -> Self {
        Self { foods, cache }
    }

    /// Every food item with its ingredient requirements, name ascending
    pub async fn get_all(&self) -> RepoResult<Vec<FoodItem>> {
        let key = keys::food_items();
        if let Some(cached) = cache::get_json::<Vec<FoodItem>>(&*self.cache, &key).await {
            tracing::debug!("Food items served from cache");
            return Ok(cached);
        }

        let items = self.foods.find_all().await?;
        cache::put_json(&*self.cache, &key, &items, FOOD_TTL).await;
        Ok(items)
    }

    pub async fn get_by_id(&self, id: &str) -> RepoResult<Option<FoodItem>> {
        let key = keys::food_item(id);
        if let Some(cached) = cache::get_json::<FoodItem>(&*self.cache, &key).await {
            return Ok(Some(cached));
        }

        let item = self.foods.find_by_id(id).await?;
        if let Some(item) = &item {
            cache::put_json(&*self.cache, &key, item, FOOD_TTL).await;
        }
        Ok(item)
    }

    /// Batch lookup with partial-cache-hit reconciliation: cache misses are
    /// fetched in ONE backing query and each fetched item is cached
    /// individually. No ordering guarantee on the result.
    pub async fn get_by_ids(&self, ids: &[String]) -> RepoResult<Vec<FoodItem>> {
        let mut unique: Vec<&String> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        // Probe every per-item key concurrently
        let probes = unique.iter().map(|id| {
            let store = self.cache.clone();
            let key = keys::food_item(id);
            async move { cache::get_json::<FoodItem>(&*store, &key).await }
        });
        let hits = futures::future::join_all(probes).await;

        let mut found: HashMap<String, FoodItem> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for (id, hit) in unique.iter().zip(hits) {
            match hit {
                Some(item) => {
                    found.insert((*id).clone(), item);
                }
                None => missing.push((*id).clone()),
            }
        }

        let cached_hits = found.len();
        if !missing.is_empty() {
            let fetched = self.foods.find_by_ids(&missing).await?;
            for item in fetched {
                cache::put_json(&*self.cache, &keys::food_item(&item.id), &item, FOOD_TTL).await;
                found.insert(item.id.clone(), item);
            }
        }

        tracing::debug!(
            requested = ids.len(),
            cached = cached_hits,
            fetched = missing.len(),
            "Batch food lookup"
        );
        Ok(found.into_values().collect())
    }

    pub async fn create_food_item(&self, data: FoodItemCreate) -> RepoResult<FoodItem> {
        let item = self.foods.create(data).await?;
        self.invalidate(Some(&item.id)).await;
        tracing::info!(food_item_id = %item.id, name = %item.name, "Food item created");
        Ok(item)
    }

    pub async fn update_food_item(&self, id: &str, data: FoodItemUpdate) -> RepoResult<FoodItem> {
        let item = self.foods.update(id, data).await?;
        self.invalidate(Some(id)).await;
        tracing::info!(food_item_id = %id, "Food item updated");
        Ok(item)
    }

    /// Drop the aggregate key and, when given, the per-item key
    pub async fn invalidate(&self, food_item_id: Option<&str>) {
        if let Some(id) = food_item_id {
            cache::invalidate(&*self.cache, &[&keys::food_item(id)]).await;
        }
        cache::invalidate(&*self.cache, &[&keys::food_items()]).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CacheResult, MemoryCache};
    use crate::db::DbService;
    use crate::db::models::{IngredientCreate, IngredientRequirement};
    use crate::db::repository::IngredientRepository;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    /// Cache that fails every operation; the catalog must fall through
    struct FailingCache;

    #[async_trait]
    impl CacheStore for FailingCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn del(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn del_pattern(&self, _pattern: &str) -> CacheResult<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn clear(&self) -> CacheResult<()> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    async fn setup(cache: Arc<dyn CacheStore>) -> (CatalogService, FoodItemRepository) {
        let db = DbService::new_in_memory().await.unwrap();
        let foods = FoodItemRepository::new(db.pool.clone());
        let ingredients = IngredientRepository::new(db.pool.clone());

        let rice = ingredients
            .create(IngredientCreate {
                name: "Basmati Rice".into(),
                quantity: Decimal::new(100_000, 3),
                threshold: Decimal::new(20_000, 3),
                unit: "kg".into(),
                expiry_date: None,
            })
            .await
            .unwrap();

        for (name, cents) in [("Chicken Biryani", 39999i64), ("Masala Chai", 4999)] {
            foods
                .create(FoodItemCreate {
                    name: name.into(),
                    price: Decimal::new(cents, 2),
                    description: String::new(),
                    image: String::new(),
                    ingredients: vec![IngredientRequirement {
                        ingredient_id: rice.id.clone(),
                        qty_required: Decimal::new(300, 3),
                    }],
                })
                .await
                .unwrap();
        }

        (CatalogService::new(foods.clone(), cache), foods)
    }

    #[tokio::test]
    async fn get_all_is_read_through_cached() {
        let (catalog, foods) = setup(Arc::new(MemoryCache::new())).await;

        let first = catalog.get_all().await.unwrap();
        assert_eq!(first.len(), 2);
        // Name ascending
        assert_eq!(first[0].name, "Chicken Biryani");
        assert_eq!(first[1].name, "Masala Chai");

        // Remove a row underneath the cache; the cached aggregate must
        // still be served, proving the second call never hit the store
        foods.delete_raw(&first[1].id).await.unwrap();
        let second = catalog.get_all().await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn get_by_id_misses_then_hits() {
        let (catalog, foods) = setup(Arc::new(MemoryCache::new())).await;
        let all = catalog.get_all().await.unwrap();
        let id = all[0].id.clone();

        let item = catalog.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(item.name, "Chicken Biryani");
        assert_eq!(item.ingredients.len(), 1);

        foods.delete_raw(&id).await.unwrap();
        // Still served from the per-item key
        assert!(catalog.get_by_id(&id).await.unwrap().is_some());

        assert!(catalog.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_by_ids_reconciles_partial_hits() {
        let cache = Arc::new(MemoryCache::new());
        let (catalog, _foods) = setup(cache.clone()).await;
        let all = catalog.get_all().await.unwrap();
        let (a, b) = (all[0].id.clone(), all[1].id.clone());

        // Prime only one per-item key
        catalog.get_by_id(&a).await.unwrap();

        let batch = catalog
            .get_by_ids(&[a.clone(), b.clone(), a.clone()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);

        // The miss was cached individually on the way out
        assert!(
            cache
                .get(&keys::food_item(&b))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_dropped_from_batch() {
        let (catalog, _foods) = setup(Arc::new(MemoryCache::new())).await;
        let all = catalog.get_all().await.unwrap();

        let batch = catalog
            .get_by_ids(&[all[0].id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, all[0].id);
    }

    #[tokio::test]
    async fn cache_failure_falls_through_to_store() {
        let (catalog, _foods) = setup(Arc::new(FailingCache)).await;

        // Every cache op errors; reads still succeed from the database
        let all = catalog.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(catalog.get_by_id(&all[0].id).await.unwrap().is_some());
        let batch = catalog.get_by_ids(&[all[0].id.clone()]).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn mutation_invalidates_aggregate_and_item_keys() {
        let cache = Arc::new(MemoryCache::new());
        let (catalog, _foods) = setup(cache.clone()).await;

        let all = catalog.get_all().await.unwrap();
        let id = all[0].id.clone();
        catalog.get_by_id(&id).await.unwrap();
        assert!(cache.get(&keys::food_items()).await.unwrap().is_some());

        let updated = catalog
            .update_food_item(
                &id,
                FoodItemUpdate {
                    price: Some(Decimal::new(42999, 2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Decimal::new(42999, 2));

        assert!(cache.get(&keys::food_items()).await.unwrap().is_none());
        assert!(cache.get(&keys::food_item(&id)).await.unwrap().is_none());

        // Fresh read sees the new price
        let reread = catalog.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(reread.price, Decimal::new(42999, 2));
    }
}
