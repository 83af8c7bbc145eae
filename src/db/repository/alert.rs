//! Alert Repository

use super::{RepoError, RepoResult, new_id};
use crate::db::models::{AiAlert, AlertDraft, AlertSeverity, AlertType, Ingredient};
use crate::utils::units::milli_to_qty;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

const ALERT_COLS: &str = "a.id, a.type AS alert_type, a.severity, a.title, a.message, \
     a.ingredient_id, a.is_read, a.metadata, a.created_at, \
     i.id AS i_id, i.name AS i_name, i.quantity_milli AS i_quantity_milli, \
     i.threshold_milli AS i_threshold_milli, i.unit AS i_unit, \
     i.expiry_date AS i_expiry_date, i.created_at AS i_created_at, \
     i.updated_at AS i_updated_at";

#[derive(Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
}

fn map_alert_row(row: &SqliteRow) -> RepoResult<AiAlert> {
    let alert_type: String = row.try_get("alert_type")?;
    let severity: String = row.try_get("severity")?;
    let metadata: Option<String> = row.try_get("metadata")?;

    let ingredient_join: Option<String> = row.try_get("i_id")?;
    let ingredient = match ingredient_join {
        Some(id) => Some(Ingredient {
            id,
            name: row.try_get("i_name")?,
            quantity: milli_to_qty(row.try_get("i_quantity_milli")?),
            threshold: milli_to_qty(row.try_get("i_threshold_milli")?),
            unit: row.try_get("i_unit")?,
            expiry_date: row.try_get("i_expiry_date")?,
            created_at: row.try_get("i_created_at")?,
            updated_at: row.try_get("i_updated_at")?,
        }),
        None => None,
    };

    Ok(AiAlert {
        id: row.try_get("id")?,
        alert_type: alert_type.parse::<AlertType>().map_err(RepoError::Database)?,
        severity: severity
            .parse::<AlertSeverity>()
            .map_err(RepoError::Database)?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        ingredient_id: row.try_get("ingredient_id")?,
        is_read: row.try_get("is_read")?,
        metadata: metadata.and_then(|raw| serde_json::from_str(&raw).ok()),
        created_at: row.try_get("created_at")?,
        ingredient,
    })
}

impl AlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Batch-insert alerts on the given connection, skipping exact
    /// duplicates. Returns the number of rows written.
    pub async fn create_many_on(
        conn: &mut SqliteConnection,
        drafts: &[AlertDraft],
    ) -> RepoResult<u64> {
        if drafts.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT OR IGNORE INTO ai_alerts \
             (id, type, severity, title, message, ingredient_id, is_read, created_at) ",
        );
        qb.push_values(drafts, |mut b, draft| {
            b.push_bind(new_id())
                .push_bind(draft.alert_type.as_str())
                .push_bind(draft.severity.as_str())
                .push_bind(&draft.title)
                .push_bind(&draft.message)
                .push_bind(&draft.ingredient_id)
                .push_bind(false)
                .push_bind(now);
        });
        let result = qb.build().execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    pub async fn create_many(&self, drafts: &[AlertDraft]) -> RepoResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::create_many_on(conn.as_mut(), drafts).await
    }

    /// Alerts filtered by read state, newest first, capped at `limit`
    pub async fn find_by_read(&self, is_read: bool, limit: i64) -> RepoResult<Vec<AiAlert>> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLS} FROM ai_alerts a \
             LEFT JOIN ingredients i ON i.id = a.ingredient_id \
             WHERE a.is_read = ? ORDER BY a.created_at DESC, a.id DESC LIMIT ?"
        ))
        .bind(is_read)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_alert_row).collect()
    }

    /// Idempotent: marking an already-read alert succeeds
    pub async fn mark_read(&self, id: &str) -> RepoResult<()> {
        let result = sqlx::query("UPDATE ai_alerts SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Alert {id} not found")));
        }
        Ok(())
    }
}
