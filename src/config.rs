//! Router configuration
//!
//! Continuation vocabulary for short replies and the session store backend.

use crate::error::RouterError;
use crate::Result;
use std::env;

const AFFIRMATIVE_REPLIES: &[&str] = &[
    "sim", "quero", "ok", "isso", "pode", "claro", "bora", "vamos", "por favor",
    "afirmativo", "yes", "s", "confirma", "confirmo", "aceito", "pode ser",
    "quero sim", "com certeza",
];

const NEGATIVE_REPLIES: &[&str] = &[
    "não", "nao", "n", "nunca", "jamais", "deixa", "cancela", "esquece",
    "não obrigado", "nao obrigado", "agora não", "agora nao",
];

const RECOMMENDATION_REPLIES: &[&str] = &[
    "ajuda", "me ajuda", "o que você indica", "o que vc indica",
    "o que você sugere", "o que vc sugere", "o que você recomenda",
    "o que vc recomenda", "indica", "sugere", "recomenda",
];

/// Token lists that make a message count as a short reply.
///
/// Entries are compared against the whole normalised message, so "sim" matches
/// "Sim!" but not "sim, gastei 50".
#[derive(Debug, Clone)]
pub struct ContinuationConfig {
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
    pub recommendation: Vec<String>,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            affirmative: to_owned(AFFIRMATIVE_REPLIES),
            negative: to_owned(NEGATIVE_REPLIES),
            recommendation: to_owned(RECOMMENDATION_REPLIES),
        }
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Session store backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Postgres connection string; in-memory store when absent
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
        }
    }
}

impl StoreConfig {
    /// Reads `POSTGRES_URL` (or `DATABASE_URL`) and `SESSION_STORE_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_blank = |key: &str| lookup(key).filter(|url| !url.trim().is_empty());
        let database_url = non_blank("POSTGRES_URL").or_else(|| non_blank("DATABASE_URL"));

        let max_connections = match lookup("SESSION_STORE_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                RouterError::ConfigError(format!(
                    "SESSION_STORE_MAX_CONNECTIONS must be a positive integer: {}",
                    e
                ))
            })?,
            None => StoreConfig::default().max_connections,
        };

        if max_connections == 0 {
            return Err(RouterError::ConfigError(
                "SESSION_STORE_MAX_CONNECTIONS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}
