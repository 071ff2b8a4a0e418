//! Core data models for the agent router

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

//
// ================= Agents =================
//

/// The specialised agents a turn can be routed to. Exactly one per turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    /// Registers transactions described in text
    Registrar,
    /// Registers transactions read from an attached image (receipts, bills)
    RegistrarVision,
    /// Financial summaries and analysis; also the default agent
    Cfo,
    /// Answers "can I afford this?" questions
    Guardian,
    /// Explains financial concepts
    Educator,
}

impl AgentId {
    /// Agent used when nothing else matches
    pub const DEFAULT: AgentId = AgentId::Cfo;

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Registrar => "registrar",
            AgentId::RegistrarVision => "registrar_vision",
            AgentId::Cfo => "cfo",
            AgentId::Guardian => "guardian",
            AgentId::Educator => "educator",
        }
    }

    pub fn parse(value: &str) -> Option<AgentId> {
        match value.trim().to_lowercase().as_str() {
            "registrar" => Some(AgentId::Registrar),
            "registrar_vision" => Some(AgentId::RegistrarVision),
            "cfo" => Some(AgentId::Cfo),
            "guardian" => Some(AgentId::Guardian),
            "educator" => Some(AgentId::Educator),
            _ => None,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= History =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior message of the conversation, oldest first in a history slice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let role = match value.get("role").and_then(Value::as_str)? {
            "user" => Role::User,
            "assistant" | "agent" => Role::Assistant,
            _ => return None,
        };
        let content = value
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self { role, content })
    }
}

/// Content of the last entry, if that entry was written by the assistant.
pub fn last_assistant_message(history: &[HistoryEntry]) -> Option<&str> {
    match history.last() {
        Some(entry) if entry.role == Role::Assistant => Some(entry.content.as_str()),
        _ => None,
    }
}

//
// ================= Turn Input =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    #[serde(default)]
    pub has_image: bool,
}

impl Capabilities {
    pub fn with_image() -> Self {
        Self { has_image: true }
    }
}

/// Everything the router needs to know about the current turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnInput {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl TurnInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Lenient decoding of a request payload.
    ///
    /// A non-string message becomes the empty string, a missing or malformed
    /// history becomes empty and unknown history entries are dropped.
    pub fn from_value(value: &Value) -> Self {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let has_image = value
            .get("capabilities")
            .and_then(|c| c.get("has_image").or_else(|| c.get("hasImage")))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let history = value
            .get("history")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(HistoryEntry::from_value).collect())
            .unwrap_or_default();

        Self {
            message,
            capabilities: Capabilities { has_image },
            history,
        }
    }
}

//
// ================= Conversation Ids =================
//

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Conversation id from a caller-supplied key.
///
/// Valid UUIDs are used as-is; any other non-blank key maps to a stable UUID,
/// so the same chat id always addresses the same session state.
pub fn conversation_id(value: Option<&str>, fallback_seed: &str) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}
