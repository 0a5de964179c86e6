use crate::traits::PersistenceBackend;
use crate::types::{AggregatorError, NewFavorite, OrderState, Result, StoredFavorite};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// Direct PostgreSQL storage keyed by user id.
pub struct PgBackend {
    pool: PgPool,
    user_id: String,
}

impl PgBackend {
    pub async fn new(database_url: &str, user_id: impl Into<String>) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool, user_id: user_id.into() })
    }

    pub fn from_pool(pool: PgPool, user_id: impl Into<String>) -> Self {
        Self { pool, user_id: user_id.into() }
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_favorites (
                id BIGSERIAL PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                content_id VARCHAR(512) NOT NULL,
                content_type VARCHAR(32) NOT NULL,
                content_data JSONB NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                UNIQUE (user_id, content_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_content_order (
                user_id VARCHAR(255) PRIMARY KEY,
                content_order JSONB NOT NULL DEFAULT '[]'::jsonb,
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Favorites and content order tables are ready");
        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for PgBackend {
    async fn list_favorites(&self) -> Result<Vec<StoredFavorite>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content_id, content_type, content_data, created_at
            FROM user_favorites
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(&self.user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut favorites = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let created_at: Option<DateTime<Utc>> = row.try_get("created_at")?;
            favorites.push(StoredFavorite {
                id: id.to_string(),
                content_id: row.try_get("content_id")?,
                content_type: row.try_get("content_type")?,
                content_data: row.try_get::<Value, _>("content_data")?,
                created_at: created_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            });
        }
        Ok(favorites)
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_favorites (user_id, content_id, content_type, content_data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, content_id) DO NOTHING
            "#,
        )
        .bind(&self.user_id)
        .bind(&favorite.content_id)
        .bind(&favorite.content_type)
        .bind(&favorite.content_data)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AggregatorError::AlreadyFavorited { content_id: favorite.content_id.clone() });
        }
        debug!("Inserted favorite {} for {}", favorite.content_id, self.user_id);
        Ok(())
    }

    async fn remove_favorite(&self, record_id: &str) -> Result<()> {
        let not_found = || AggregatorError::NotFound { id: record_id.to_string() };
        let id: i64 = record_id.parse().map_err(|_| not_found())?;

        let removed = sqlx::query("DELETE FROM user_favorites WHERE id = $1 AND user_id = $2 RETURNING id")
            .bind(id)
            .bind(&self.user_id)
            .fetch_optional(&self.pool)
            .await?;

        removed.map(|_| ()).ok_or_else(not_found)
    }

    async fn load_order(&self) -> Result<OrderState> {
        let row = sqlx::query("SELECT content_order FROM user_content_order WHERE user_id = $1")
            .bind(&self.user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let stored: Value = r.try_get("content_order")?;
                let ids: Vec<String> = serde_json::from_value(stored).unwrap_or_default();
                Ok(OrderState::new(ids))
            }
            None => Ok(OrderState::default()),
        }
    }

    async fn save_order(&self, order: &OrderState) -> Result<()> {
        let payload = serde_json::to_value(order)?;
        sqlx::query(
            r#"
            INSERT INTO user_content_order (user_id, content_order, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                content_order = EXCLUDED.content_order,
                updated_at = NOW()
            "#,
        )
        .bind(&self.user_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| AggregatorError::OrderPersistFailure(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
