//! Session state tracker
//!
//! Three pure operations over conversation state:
//! - `resolve`: short reply + history → continuing agent
//! - `instruction_for`: pending state → directive for the next agent
//! - `extract`: structured agent response → state update

use super::continuation::{open_question, reply_intent, ReplyIntent};
use super::{AgentResponse, PendingAction, Patch, SessionState, SessionUpdate, StateSignal};
use crate::config::ContinuationConfig;
use crate::models::{AgentId, HistoryEntry};
use crate::text::format_brl;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

const INSTRUCTION_HEADER: &str = "## CONTEXTO DA CONVERSA ANTERIOR\n";

lazy_static! {
    static ref DEFAULT_TRACKER: SessionTracker = SessionTracker::new();
}

/// A short reply resolved against the pending exchange
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub agent: AgentId,
    pub intent: ReplyIntent,
}

/// Tracks pending actions across turns
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    continuation: ContinuationConfig,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(continuation: ContinuationConfig) -> Self {
        Self { continuation }
    }

    pub fn config(&self) -> &ContinuationConfig {
        &self.continuation
    }

    pub fn reply_intent(&self, message: &str) -> Option<ReplyIntent> {
        reply_intent(&self.continuation, message)
    }

    /// Agent continuing the exchange, when `reply` is a short reply to a
    /// pending question in the immediately preceding assistant turn.
    ///
    /// `None` means "fall through to the classifier".
    pub fn resolve(&self, reply: &str, history: &[HistoryEntry]) -> Option<AgentId> {
        self.reply_intent(reply)?;
        open_question(history).map(|question| question.agent())
    }

    /// Like `resolve`, but also reports the reply intent and falls back to the
    /// persisted pending action when the history carries no recognisable
    /// question.
    pub fn resolve_turn(
        &self,
        reply: &str,
        history: &[HistoryEntry],
        state: &SessionState,
    ) -> Option<Resolution> {
        let intent = self.reply_intent(reply)?;

        if let Some(question) = open_question(history) {
            debug!(?question, ?intent, "Short reply continues pending question");
            return Some(Resolution {
                agent: question.agent(),
                intent,
            });
        }

        let action = state.pending_action.as_ref()?;
        debug!(action = action.kind(), ?intent, "Short reply answers pending action");
        Some(Resolution {
            agent: action.owner(state.last_agent),
            intent,
        })
    }

    /// Directive describing the open pending action; empty when idle.
    pub fn instruction_for(&self, state: &SessionState) -> String {
        self.instruction_for_turn(state, None)
    }

    /// Directive for the next agent, including how the user just answered.
    pub fn instruction_for_turn(&self, state: &SessionState, intent: Option<ReplyIntent>) -> String {
        let pending = state.pending_action.as_ref();
        if pending.is_none() && intent.is_none() {
            return String::new();
        }

        let mut out = String::from(INSTRUCTION_HEADER);

        if let Some(question) = &state.last_question {
            out.push_str(&format!("Você perguntou: \"{}\"\n", question));
        }

        if let Some(action) = pending {
            out.push_str(&format!(
                "Ação pendente ({}): {}.\n",
                action.kind(),
                action.describe()
            ));
        }

        match intent {
            Some(ReplyIntent::Accept) => {
                match pending {
                    Some(action) => {
                        out.push_str(&format!(
                            "O usuário CONFIRMOU que quer prosseguir com: {}\n",
                            action.kind()
                        ));
                    }
                    None => out.push_str("O usuário CONFIRMOU que quer prosseguir.\n"),
                }
                out.push_str(
                    "EXECUTE A AÇÃO AGORA. Não repita a pergunta. Não peça confirmação novamente.\n",
                );
                if let Some(PendingAction::CreateBudget { .. }) = pending {
                    out.push_str(
                        "Crie um orçamento sugerido baseado nos gastos atuais do usuário. Apresente valores por categoria.\n",
                    );
                }
            }
            Some(ReplyIntent::Decline) => {
                out.push_str("O usuário CANCELOU a ação. Pergunte como mais você pode ajudar.\n");
            }
            Some(ReplyIntent::Recommend) => {
                out.push_str(
                    "O usuário quer sua RECOMENDAÇÃO. Dê conselhos práticos e específicos baseados nos dados financeiros.\n",
                );
            }
            None => {
                out.push_str(
                    "Confirme com o usuário ou colete os dados que faltam antes de prosseguir.\n",
                );
            }
        }

        if let Some(value) = state.context.last_mentioned_value {
            out.push_str(&format!("Valor em discussão: {}\n", format_brl(value)));
        }
        if !state.context.last_mentioned_categories.is_empty() {
            out.push_str(&format!(
                "Categorias em discussão: {}\n",
                state.context.last_mentioned_categories.join(", ")
            ));
        }

        out
    }

    /// State update carried by the agent's structured signal.
    ///
    /// Free text is never inspected; a response without a signal yields an
    /// empty update.
    pub fn extract(&self, response: &AgentResponse) -> SessionUpdate {
        match &response.state {
            None => SessionUpdate::default(),
            Some(StateSignal::Pending {
                action,
                question,
                context,
            }) => {
                debug!(agent = %response.agent, action = action.kind(), "Agent opened pending action");
                SessionUpdate {
                    pending_action: Patch::Set(action.clone()),
                    last_question: question.clone().map_or(Patch::Clear, Patch::Set),
                    last_agent: Some(response.agent),
                    context: context.clone(),
                }
            }
            Some(StateSignal::Resolved { outcome }) => {
                debug!(agent = %response.agent, ?outcome, "Agent resolved pending action");
                SessionUpdate {
                    pending_action: Patch::Clear,
                    last_question: Patch::Clear,
                    last_agent: Some(response.agent),
                    context: None,
                }
            }
        }
    }
}

/// `SessionTracker::resolve` with the default continuation vocabulary
pub fn resolve(reply: &str, history: &[HistoryEntry]) -> Option<AgentId> {
    DEFAULT_TRACKER.resolve(reply, history)
}

/// `SessionTracker::instruction_for` with the default tracker
pub fn instruction_for(state: &SessionState) -> String {
    DEFAULT_TRACKER.instruction_for(state)
}

/// `SessionTracker::extract` with the default tracker
pub fn extract(response: &AgentResponse) -> SessionUpdate {
    DEFAULT_TRACKER.extract(response)
}
