//! Order Repository

use super::{RepoError, RepoResult};
use crate::db::models::{FoodItemSummary, Order, OrderItem, OrderStatus};
use crate::utils::units::cents_to_money;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const ORDER_COLS: &str = "id, total_cents, status, created_at, updated_at";

const ITEM_COLS: &str = "oi.id, oi.order_id, oi.food_item_id, oi.quantity, oi.price_cents, \
     f.id AS f_id, f.name AS f_name, f.price_cents AS f_price_cents, \
     f.description AS f_description, f.image AS f_image";

/// An order line about to be inserted (already converted to minor units)
#[derive(Debug, Clone)]
pub struct OrderItemInsert {
    pub id: String,
    pub food_item_id: String,
    pub quantity: i64,
    pub price_cents: i64,
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

fn map_order_row(row: &SqliteRow) -> RepoResult<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        total: cents_to_money(row.try_get("total_cents")?),
        status: status.parse::<OrderStatus>().map_err(RepoError::Database)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        items: Vec::new(),
    })
}

fn map_item_row(row: &SqliteRow) -> RepoResult<(String, OrderItem)> {
    let food_id: Option<String> = row.try_get("f_id")?;
    let food_item = match food_id {
        Some(id) => Some(FoodItemSummary {
            id,
            name: row.try_get("f_name")?,
            price: cents_to_money(row.try_get("f_price_cents")?),
            description: row.try_get("f_description")?,
            image: row.try_get("f_image")?,
        }),
        None => None,
    };
    let item = OrderItem {
        id: row.try_get("id")?,
        food_item_id: row.try_get("food_item_id")?,
        quantity: row.try_get("quantity")?,
        price: cents_to_money(row.try_get("price_cents")?),
        food_item,
    };
    Ok((row.try_get("order_id")?, item))
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the order row and all its items on the given connection.
    /// Runs inside the order pipeline's transaction.
    pub async fn create_with_items(
        conn: &mut SqliteConnection,
        order_id: &str,
        total_cents: i64,
        status: OrderStatus,
        idempotency_key: Option<&str>,
        items: &[OrderItemInsert],
    ) -> RepoResult<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO orders (id, total_cents, status, idempotency_key, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(total_cents)
        .bind(status.as_str())
        .bind(idempotency_key)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO order_items (id, order_id, food_item_id, quantity, price_cents) ",
        );
        qb.push_values(items, |mut b, item| {
            b.push_bind(&item.id)
                .push_bind(order_id)
                .push_bind(&item.food_item_id)
                .push_bind(item.quantity)
                .push_bind(item.price_cents);
        });
        qb.build().execute(&mut *conn).await?;

        Ok(())
    }

    /// Resolve a previously used idempotency key to its order id
    pub async fn find_id_by_idempotency_key(&self, key: &str) -> RepoResult<Option<String>> {
        let row = sqlx::query("SELECT id FROM orders WHERE idempotency_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    pub async fn count(&self) -> RepoResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM orders")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("cnt")?;
        Ok(count as u64)
    }

    /// One page of orders, newest first, items attached
    pub async fn find_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLS} FROM orders ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let mut orders: Vec<Order> = rows.iter().map(map_order_row).collect::<RepoResult<_>>()?;
        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    pub async fn find_by_id_with_items(&self, id: &str) -> RepoResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut orders = vec![map_order_row(&row)?];
        self.attach_items(&mut orders).await?;
        Ok(orders.pop())
    }

    async fn attach_items(&self, orders: &mut [Order]) -> RepoResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ITEM_COLS} FROM order_items oi \
             LEFT JOIN food_items f ON f.id = oi.food_item_id WHERE oi.order_id IN ("
        ));
        {
            let mut sep = qb.separated(", ");
            for order in orders.iter() {
                sep.push_bind(order.id.clone());
            }
        }
        qb.push(")");
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let (order_id, item) = map_item_row(row)?;
            by_order.entry(order_id).or_default().push(item);
        }
        for order in orders.iter_mut() {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }
}
