//! Food Item Repository

use super::ingredient::map_ingredient_row;
use super::{RepoError, RepoResult, new_id};
use crate::db::models::{
    FoodIngredient, FoodItem, FoodItemCreate, FoodItemSummary, FoodItemUpdate,
    IngredientRequirement,
};
use crate::utils::units::{cents_to_money, milli_to_qty, money_to_cents, qty_to_milli};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

const FOOD_COLS: &str = "id, name, price_cents, description, image, created_at, updated_at";

// Link rows carry the join fields plus the full ingredient, with the
// ingredient's columns unaliased so `map_ingredient_row` applies
const LINK_COLS: &str = "fi.id AS link_id, fi.food_item_id AS food_item_id, \
     fi.qty_required_milli, i.id, i.name, i.quantity_milli, i.threshold_milli, \
     i.unit, i.expiry_date, i.created_at, i.updated_at";

#[derive(Clone)]
pub struct FoodItemRepository {
    pool: SqlitePool,
}

fn map_food_row(row: &SqliteRow) -> RepoResult<FoodItem> {
    Ok(FoodItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: cents_to_money(row.try_get("price_cents")?),
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        ingredients: Vec::new(),
    })
}

fn map_summary_row(row: &SqliteRow) -> RepoResult<FoodItemSummary> {
    Ok(FoodItemSummary {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: cents_to_money(row.try_get("price_cents")?),
        description: row.try_get("description")?,
        image: row.try_get("image")?,
    })
}

fn map_link_row(row: &SqliteRow) -> RepoResult<(String, FoodIngredient)> {
    let link = FoodIngredient {
        id: row.try_get("link_id")?,
        qty_required: milli_to_qty(row.try_get("qty_required_milli")?),
        ingredient: map_ingredient_row(row)?,
    };
    Ok((row.try_get("food_item_id")?, link))
}

impl FoodItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All food items with their ingredient requirements, name ascending
    pub async fn find_all(&self) -> RepoResult<Vec<FoodItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {FOOD_COLS} FROM food_items ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        let mut items: Vec<FoodItem> = rows.iter().map(map_food_row).collect::<RepoResult<_>>()?;

        let links = sqlx::query(&format!(
            "SELECT {LINK_COLS} FROM food_ingredients fi \
             JOIN ingredients i ON i.id = fi.ingredient_id ORDER BY i.name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        let mut by_food = group_links(&links)?;

        for item in &mut items {
            item.ingredients = by_food.remove(&item.id).unwrap_or_default();
        }
        Ok(items)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<FoodItem>> {
        let row = sqlx::query(&format!("SELECT {FOOD_COLS} FROM food_items WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut item = map_food_row(&row)?;

        let links = sqlx::query(&format!(
            "SELECT {LINK_COLS} FROM food_ingredients fi \
             JOIN ingredients i ON i.id = fi.ingredient_id \
             WHERE fi.food_item_id = ? ORDER BY i.name ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        item.ingredients = links
            .iter()
            .map(|r| map_link_row(r).map(|(_, link)| link))
            .collect::<RepoResult<_>>()?;

        Ok(Some(item))
    }

    /// Batch lookup with ingredients. One query for the items, one for the
    /// links, regardless of how many ids are requested.
    pub async fn find_by_ids(&self, ids: &[String]) -> RepoResult<Vec<FoodItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {FOOD_COLS} FROM food_items WHERE id IN ("
        ));
        {
            let mut sep = qb.separated(", ");
            for id in ids {
                sep.push_bind(id);
            }
        }
        qb.push(")");
        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut items: Vec<FoodItem> = rows.iter().map(map_food_row).collect::<RepoResult<_>>()?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {LINK_COLS} FROM food_ingredients fi \
             JOIN ingredients i ON i.id = fi.ingredient_id WHERE fi.food_item_id IN ("
        ));
        {
            let mut sep = qb.separated(", ");
            for id in ids {
                sep.push_bind(id);
            }
        }
        qb.push(")");
        let links = qb.build().fetch_all(&self.pool).await?;
        let mut by_food = group_links(&links)?;

        for item in &mut items {
            item.ingredients = by_food.remove(&item.id).unwrap_or_default();
        }
        Ok(items)
    }

    /// Summaries of every item except the given ids, name ascending,
    /// capped at `limit` (suggestion candidate pool)
    pub async fn find_summaries_excluding(
        &self,
        exclude: &[String],
        limit: i64,
    ) -> RepoResult<Vec<FoodItemSummary>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {FOOD_COLS} FROM food_items"));
        if !exclude.is_empty() {
            qb.push(" WHERE id NOT IN (");
            {
                let mut sep = qb.separated(", ");
                for id in exclude {
                    sep.push_bind(id);
                }
            }
            qb.push(")");
        }
        qb.push(" ORDER BY name ASC LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_summary_row).collect()
    }

    pub async fn create(&self, data: FoodItemCreate) -> RepoResult<FoodItem> {
        if data.name.trim().is_empty() {
            return Err(RepoError::Validation("name cannot be empty".into()));
        }
        let price_cents = money_to_cents(data.price, "price")?;
        let now = Utc::now();
        let id = new_id();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO food_items (id, name, price_cents, description, image, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&data.name)
        .bind(price_cents)
        .bind(&data.description)
        .bind(&data.image)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        Self::replace_links(&mut tx, &id, &data.ingredients).await?;
        tx.commit().await?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create food item".into()))
    }

    pub async fn update(&self, id: &str, data: FoodItemUpdate) -> RepoResult<FoodItem> {
        let mut tx = self.pool.begin().await?;

        // Build dynamic SET clauses, binding in declaration order
        let mut sets: Vec<&str> = Vec::new();
        if data.name.is_some() {
            sets.push("name = ?");
        }
        if data.price.is_some() {
            sets.push("price_cents = ?");
        }
        if data.description.is_some() {
            sets.push("description = ?");
        }
        if data.image.is_some() {
            sets.push("image = ?");
        }
        sets.push("updated_at = ?");

        let sql = format!("UPDATE food_items SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(v) = &data.name {
            query = query.bind(v);
        }
        if let Some(v) = data.price {
            query = query.bind(money_to_cents(v, "price")?);
        }
        if let Some(v) = &data.description {
            query = query.bind(v);
        }
        if let Some(v) = &data.image {
            query = query.bind(v);
        }
        let result = query.bind(Utc::now()).bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Food item {id} not found")));
        }

        // When a requirement set is supplied it replaces the existing one
        if let Some(requirements) = &data.ingredients {
            sqlx::query("DELETE FROM food_ingredients WHERE food_item_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::replace_links(&mut tx, id, requirements).await?;
        }

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Food item {id} not found")))
    }

    async fn replace_links(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        food_id: &str,
        requirements: &[IngredientRequirement],
    ) -> RepoResult<()> {
        for req in requirements {
            let qty_milli = qty_to_milli(req.qty_required, "qtyRequired")?;
            if qty_milli <= 0 {
                return Err(RepoError::Validation(format!(
                    "qtyRequired must be positive for ingredient {}",
                    req.ingredient_id
                )));
            }
            sqlx::query(
                "INSERT INTO food_ingredients (id, food_item_id, ingredient_id, qty_required_milli) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(new_id())
            .bind(food_id)
            .bind(&req.ingredient_id)
            .bind(qty_milli)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Test hook used to prove cache hits: removes the row underneath the
    /// cache without touching any cache key
    #[cfg(test)]
    pub async fn delete_raw(&self, id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM food_ingredients WHERE food_item_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM food_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn group_links(rows: &[SqliteRow]) -> RepoResult<HashMap<String, Vec<FoodIngredient>>> {
    let mut by_food: HashMap<String, Vec<FoodIngredient>> = HashMap::new();
    for row in rows {
        let (food_id, link) = map_link_row(row)?;
        by_food.entry(food_id).or_default().push(link);
    }
    Ok(by_food)
}
