//! Session state persistence layer
//!
//! Responsible for storing and loading per-conversation `SessionState`.
//! In-memory by default; Postgres when a database URL is configured.

pub mod postgres;

pub use postgres::PostgresSessionStore;

use crate::config::StoreConfig;
use crate::session::SessionState;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Trait for session state persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// State of a conversation; `Idle` default when nothing was saved yet
    async fn load(&self, conversation_id: Uuid) -> Result<SessionState>;
    async fn save(&self, conversation_id: Uuid, state: &SessionState) -> Result<()>;
    async fn clear(&self, conversation_id: Uuid) -> Result<()>;
}

/// In-memory session store for development and tests
pub struct InMemorySessionStore {
    states: Arc<RwLock<HashMap<Uuid, SessionState>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of conversations with saved state
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, conversation_id: Uuid) -> Result<SessionState> {
        let states = self.states.read().await;
        Ok(states.get(&conversation_id).cloned().unwrap_or_default())
    }

    async fn save(&self, conversation_id: Uuid, state: &SessionState) -> Result<()> {
        let mut states = self.states.write().await;
        states.insert(conversation_id, state.clone());
        Ok(())
    }

    async fn clear(&self, conversation_id: Uuid) -> Result<()> {
        let mut states = self.states.write().await;
        states.remove(&conversation_id);
        Ok(())
    }
}

/// Pick the session store backend from configuration.
///
/// Falls back to the in-memory store when no database URL is set or the
/// Postgres pool cannot be created.
pub fn build_store(config: &StoreConfig) -> Box<dyn SessionStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PostgresSessionStore::connect_lazy(url, config.max_connections) {
            Ok(store) => {
                info!("Session store backend: postgres");
                return Box::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres session store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Session store backend: in-memory");
    Box::new(InMemorySessionStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentId;
    use crate::session::PendingAction;

    #[tokio::test]
    async fn test_load_unknown_conversation_is_idle() {
        let store = InMemorySessionStore::new();
        let state = store.load(Uuid::new_v4()).await.unwrap();
        assert_eq!(state, SessionState::default());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = InMemorySessionStore::new();
        let conversation_id = Uuid::new_v4();

        let mut state = SessionState::default();
        state.record_turn(AgentId::Cfo);
        state.pending_action = Some(PendingAction::SetGoal {
            name: Some("viagem".to_string()),
            target_amount: Some(5000.0),
        });

        store.save(conversation_id, &state).await.unwrap();
        assert_eq!(store.load(conversation_id).await.unwrap(), state);
        assert_eq!(store.load(Uuid::new_v4()).await.unwrap(), SessionState::default());

        store.clear(conversation_id).await.unwrap();
        assert_eq!(store.load(conversation_id).await.unwrap(), SessionState::default());
    }

    #[test]
    fn test_build_store_without_url_is_in_memory() {
        let store = build_store(&StoreConfig::default());
        let state = tokio_test::block_on(store.load(Uuid::new_v4())).unwrap();
        assert!(state.is_idle());
    }
}
