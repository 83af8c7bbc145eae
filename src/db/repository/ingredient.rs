//! Ingredient Repository

use super::{RepoError, RepoResult, new_id};
use crate::db::models::{Ingredient, IngredientCreate};
use crate::utils::units::{milli_to_qty, qty_to_milli};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const COLS: &str =
    "id, name, quantity_milli, threshold_milli, unit, expiry_date, created_at, updated_at";

#[derive(Clone)]
pub struct IngredientRepository {
    pool: SqlitePool,
}

pub(crate) fn map_ingredient_row(row: &SqliteRow) -> RepoResult<Ingredient> {
    Ok(Ingredient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        quantity: milli_to_qty(row.try_get("quantity_milli")?),
        threshold: milli_to_qty(row.try_get("threshold_milli")?),
        unit: row.try_get("unit")?,
        expiry_date: row.try_get("expiry_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl IngredientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All ingredients, name ascending
    pub async fn find_all(&self) -> RepoResult<Vec<Ingredient>> {
        let rows =
            sqlx::query(&format!("SELECT {COLS} FROM ingredients ORDER BY name ASC"))
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(map_ingredient_row).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Ingredient>> {
        let row = sqlx::query(&format!("SELECT {COLS} FROM ingredients WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_ingredient_row).transpose()
    }

    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Ingredient>> {
        let row = sqlx::query(&format!("SELECT {COLS} FROM ingredients WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_ingredient_row).transpose()
    }

    pub async fn create(&self, data: IngredientCreate) -> RepoResult<Ingredient> {
        let now = Utc::now();
        let id = new_id();
        let quantity_milli = qty_to_milli(data.quantity, "quantity")?;
        let threshold_milli = qty_to_milli(data.threshold, "threshold")?;

        let row = sqlx::query(&format!(
            "INSERT INTO ingredients (id, name, quantity_milli, threshold_milli, unit, expiry_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLS}"
        ))
        .bind(&id)
        .bind(&data.name)
        .bind(quantity_milli)
        .bind(threshold_milli)
        .bind(&data.unit)
        .bind(data.expiry_date)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        map_ingredient_row(&row)
    }

    /// Overwrite the stock level (admin correction)
    pub async fn set_quantity(&self, id: &str, quantity: Decimal) -> RepoResult<Ingredient> {
        let quantity_milli = qty_to_milli(quantity, "quantity")?;
        let mut conn = self.pool.acquire().await?;
        Self::set_quantity_on(conn.as_mut(), id, quantity_milli).await
    }

    /// Transaction-scoped variant of [`Self::set_quantity`]
    pub async fn set_quantity_on(
        conn: &mut SqliteConnection,
        id: &str,
        quantity_milli: i64,
    ) -> RepoResult<Ingredient> {
        let row = sqlx::query(&format!(
            "UPDATE ingredients SET quantity_milli = ?, updated_at = ? WHERE id = ? RETURNING {COLS}"
        ))
        .bind(quantity_milli)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Ingredient {id} not found")))?;

        map_ingredient_row(&row)
    }

    /// Apply several stock corrections in one transaction; any unknown id
    /// rolls back the whole batch
    pub async fn set_quantities(
        &self,
        updates: &[(String, Decimal)],
    ) -> RepoResult<Vec<Ingredient>> {
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(updates.len());
        for (id, quantity) in updates {
            let quantity_milli = qty_to_milli(*quantity, "quantity")?;
            updated.push(Self::set_quantity_on(&mut tx, id, quantity_milli).await?);
        }
        tx.commit().await?;
        Ok(updated)
    }

    /// Atomic stock adjustment relative to the current value, returning the
    /// post-update row. This is the only write path for stock levels: the
    /// arithmetic happens in the UPDATE itself, never read-modify-write in
    /// the application.
    pub async fn adjust_stock_on(
        conn: &mut SqliteConnection,
        id: &str,
        delta_milli: i64,
    ) -> RepoResult<Ingredient> {
        let row = sqlx::query(&format!(
            "UPDATE ingredients SET quantity_milli = quantity_milli + ?, updated_at = ? \
             WHERE id = ? RETURNING {COLS}"
        ))
        .bind(delta_milli)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Ingredient {id} not found")))?;

        map_ingredient_row(&row)
    }

    pub async fn decrement_stock(&self, id: &str, amount: Decimal) -> RepoResult<Ingredient> {
        let milli = qty_to_milli(amount, "amount")?;
        let mut conn = self.pool.acquire().await?;
        Self::adjust_stock_on(conn.as_mut(), id, -milli).await
    }

    pub async fn increment_stock(&self, id: &str, amount: Decimal) -> RepoResult<Ingredient> {
        let milli = qty_to_milli(amount, "amount")?;
        let mut conn = self.pool.acquire().await?;
        Self::adjust_stock_on(conn.as_mut(), id, milli).await
    }

    /// Ingredients whose expiry falls within `[now, now + window_days]`,
    /// soonest first
    pub async fn near_expiry(&self, window_days: i64) -> RepoResult<Vec<Ingredient>> {
        let now = Utc::now();
        let cutoff = now + Duration::days(window_days);
        let rows = sqlx::query(&format!(
            "SELECT {COLS} FROM ingredients \
             WHERE expiry_date IS NOT NULL AND expiry_date >= ? AND expiry_date <= ? \
             ORDER BY expiry_date ASC"
        ))
        .bind(now)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_ingredient_row).collect()
    }
}
