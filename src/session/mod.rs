//! Conversation session state
//!
//! Per conversation the router remembers at most one pending action: something
//! the previous agent proposed and is waiting on the user to confirm, decline
//! or complete. State changes only between turns.
//!
//! Idle → AwaitingConfirmation(action) → Idle

pub mod continuation;
pub mod mentions;
pub mod tracker;

pub use continuation::{PendingQuestion, ReplyIntent};
pub use mentions::MentionContext;
pub use tracker::{Resolution, SessionTracker};

use crate::models::AgentId;
use crate::text::format_brl;
use serde::{Deserialize, Serialize};
use serde_json::Value;

//
// ================= Pending Actions =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingAction {
    CreateBudget {
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        amount: Option<f64>,
    },
    ConfirmTransaction {
        #[serde(default)]
        amount: Option<f64>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    ChooseCategory {
        #[serde(default)]
        options: Vec<String>,
    },
    ReallocateBudget {
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        amount: Option<f64>,
    },
    SetGoal {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        target_amount: Option<f64>,
    },
    ConfirmGoal {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        target_amount: Option<f64>,
    },
    ExplainMore {
        #[serde(default)]
        topic: Option<String>,
    },
}

impl PendingAction {
    pub fn kind(&self) -> &'static str {
        match self {
            PendingAction::CreateBudget { .. } => "create_budget",
            PendingAction::ConfirmTransaction { .. } => "confirm_transaction",
            PendingAction::ChooseCategory { .. } => "choose_category",
            PendingAction::ReallocateBudget { .. } => "reallocate_budget",
            PendingAction::SetGoal { .. } => "set_goal",
            PendingAction::ConfirmGoal { .. } => "confirm_goal",
            PendingAction::ExplainMore { .. } => "explain_more",
        }
    }

    /// Agent that resumes this action when the user answers it
    pub fn owner(&self, last_agent: Option<AgentId>) -> AgentId {
        match self {
            PendingAction::CreateBudget { .. }
            | PendingAction::ReallocateBudget { .. }
            | PendingAction::SetGoal { .. }
            | PendingAction::ConfirmGoal { .. } => AgentId::Cfo,
            PendingAction::ConfirmTransaction { .. } | PendingAction::ChooseCategory { .. } => {
                AgentId::Registrar
            }
            PendingAction::ExplainMore { .. } => last_agent.unwrap_or(AgentId::Educator),
        }
    }

    /// Human-readable description naming the identifying fields
    pub fn describe(&self) -> String {
        let quoted = |label: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|v| format!(" {}\"{}\"", label, v))
                .unwrap_or_default()
        };
        let money = |value: &Option<f64>| {
            value
                .map(|v| format!(" de {}", format_brl(v)))
                .unwrap_or_default()
        };

        match self {
            PendingAction::CreateBudget { category, amount } => format!(
                "criar um orçamento{}{}",
                quoted("para a categoria ", category),
                money(amount)
            ),
            PendingAction::ConfirmTransaction {
                amount,
                category,
                description,
            } => format!(
                "registrar a transação{}{}{}",
                quoted("", description),
                money(amount),
                quoted("na categoria ", category)
            ),
            PendingAction::ChooseCategory { options } if options.is_empty() => {
                "escolher a categoria da transação".to_string()
            }
            PendingAction::ChooseCategory { options } => format!(
                "escolher a categoria da transação (opções: {})",
                options.join(", ")
            ),
            PendingAction::ReallocateBudget { from, to, amount } => format!(
                "realocar orçamento{}{}{}",
                money(amount),
                quoted("da categoria ", from),
                quoted("para a categoria ", to)
            ),
            PendingAction::SetGoal {
                name,
                target_amount,
            } => format!("definir a meta{}{}", quoted("", name), money(target_amount)),
            PendingAction::ConfirmGoal {
                name,
                target_amount,
            } => format!(
                "confirmar a criação da meta{}{}",
                quoted("", name),
                money(target_amount)
            ),
            PendingAction::ExplainMore { topic: Some(topic) } => {
                format!("explicar mais sobre \"{}\"", topic)
            }
            PendingAction::ExplainMore { topic: None } => {
                "explicar mais sobre o assunto anterior".to_string()
            }
        }
    }
}

//
// ================= Session State =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    #[serde(default)]
    pub pending_action: Option<PendingAction>,
    #[serde(default)]
    pub last_agent: Option<AgentId>,
    /// Question the assistant asked when it opened the pending action
    #[serde(default)]
    pub last_question: Option<String>,
    #[serde(default)]
    pub context: MentionContext,
    #[serde(default)]
    pub turn_count: u32,
}

/// Borrowed view of the per-conversation state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversationStatus<'a> {
    Idle,
    AwaitingConfirmation(&'a PendingAction),
}

impl SessionState {
    pub fn status(&self) -> ConversationStatus<'_> {
        match &self.pending_action {
            Some(action) => ConversationStatus::AwaitingConfirmation(action),
            None => ConversationStatus::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending_action.is_none()
    }

    /// Back to `Idle`. Mentioned entities are kept for later turns.
    pub fn clear_pending(&mut self) {
        self.pending_action = None;
        self.last_question = None;
    }

    pub fn record_turn(&mut self, agent: AgentId) {
        self.last_agent = Some(agent);
        self.turn_count = self.turn_count.saturating_add(1);
    }

    /// Merge an update produced by the tracker. An empty update is a no-op.
    pub fn apply(&mut self, update: SessionUpdate) {
        update.pending_action.apply_to(&mut self.pending_action);
        update.last_question.apply_to(&mut self.last_question);

        if let Some(agent) = update.last_agent {
            self.last_agent = Some(agent);
        }
        if let Some(context) = update.context {
            self.context = context;
        }
    }
}

//
// ================= Updates =================
//

/// Change to a single optional field
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(value) => *slot = Some(value),
            Patch::Clear => *slot = None,
        }
    }
}

/// Delta to merge into the persisted `SessionState`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub pending_action: Patch<PendingAction>,
    pub last_question: Patch<String>,
    pub last_agent: Option<AgentId>,
    pub context: Option<MentionContext>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.pending_action.is_keep()
            && self.last_question.is_keep()
            && self.last_agent.is_none()
            && self.context.is_none()
    }
}

//
// ================= Agent Responses =================
//

/// How an accepted or declined action ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Declined,
    Completed,
}

/// Structured state signal an agent attaches to its own response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum StateSignal {
    /// The agent is now waiting on the user
    Pending {
        action: PendingAction,
        #[serde(default)]
        question: Option<String>,
        #[serde(default)]
        context: Option<MentionContext>,
    },
    /// The previously pending action is settled
    Resolved { outcome: Outcome },
}

/// A generated agent reply as handed back by the agent layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResponse {
    pub agent: AgentId,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateSignal>,
}

impl AgentResponse {
    pub fn new(agent: AgentId, content: impl Into<String>) -> Self {
        Self {
            agent,
            content: content.into(),
            state: None,
        }
    }

    pub fn with_signal(mut self, signal: StateSignal) -> Self {
        self.state = Some(signal);
        self
    }

    /// Lenient decoding: unknown agent names fall back to the default agent and
    /// a malformed state signal is treated as no signal.
    pub fn from_value(value: &Value) -> Self {
        let agent = value
            .get("agent")
            .and_then(Value::as_str)
            .and_then(AgentId::parse)
            .unwrap_or(AgentId::DEFAULT);

        let content = value
            .get("content")
            .or_else(|| value.get("reply"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let state = value
            .get("state")
            .and_then(|signal| serde_json::from_value(signal.clone()).ok());

        Self {
            agent,
            content,
            state,
        }
    }
}
