//! Postgres-backed session store
//!
//! One row per conversation, state serialized as JSON text.

use super::SessionStore;
use crate::error::RouterError;
use crate::session::SessionState;
use crate::Result;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

pub struct PostgresSessionStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresSessionStore {
    /// Create a lazily connecting pool; no connection is made until first use.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| {
                RouterError::DatabaseError(format!("Invalid session store URL: {}", e))
            })?;

        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_state (
                      conversation_id UUID PRIMARY KEY,
                      state_data TEXT NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                RouterError::DatabaseError(format!(
                    "Failed to initialize session state schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresSessionStore {
    async fn load(&self, conversation_id: Uuid) -> Result<SessionState> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT state_data FROM conversation_state WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(SessionState::default());
        };

        let data: String = row.try_get("state_data")?;

        serde_json::from_str(&data).map_err(|e| {
            RouterError::StateError(format!(
                "Stored state for conversation {} is unreadable: {}",
                conversation_id, e
            ))
        })
    }

    async fn save(&self, conversation_id: Uuid, state: &SessionState) -> Result<()> {
        self.ensure_schema().await?;

        let data = serde_json::to_string(state)?;

        sqlx::query(
            r#"
            INSERT INTO conversation_state (conversation_id, state_data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (conversation_id)
            DO UPDATE SET state_data = EXCLUDED.state_data, updated_at = NOW()
            "#,
        )
        .bind(conversation_id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, conversation_id: Uuid) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("DELETE FROM conversation_state WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
