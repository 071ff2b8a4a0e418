//! Finance Agent Router
//!
//! Routing and conversation-state engine for a Portuguese personal-finance
//! chat assistant:
//! - Picks exactly one specialist agent per user message
//! - Lets short replies ("sim", "não", "me ajuda") continue the previous exchange
//! - Remembers at most one pending action per conversation between turns
//! - Persists that state in memory or Postgres
//!
//! TURN LOOP:
//! LOAD STATE → RESOLVE SHORT REPLY → CLASSIFY? → INSTRUCT → AGENT → EXTRACT → SAVE

pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod router;
pub mod session;
pub mod state;
pub mod text;

pub use error::Result;

// Re-export common types
pub use classifier::{classify, IntentClassifier};
pub use config::{ContinuationConfig, StoreConfig};
pub use models::*;
pub use router::{Disposition, RoutingDecision, TurnRouter};
pub use session::tracker::{extract, instruction_for, resolve};
pub use session::{AgentResponse, PendingAction, SessionState, SessionTracker, StateSignal};
pub use state::{build_store, InMemorySessionStore, PostgresSessionStore, SessionStore};
