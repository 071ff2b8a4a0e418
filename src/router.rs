//! Turn router - drives one chat turn
//!
//! LOAD STATE → RESOLVE SHORT REPLY → CLASSIFY? → INSTRUCT → (agent runs) → EXTRACT → SAVE
//!
//! The agent itself runs outside this crate; the caller hands the routing
//! decision to it and passes the structured response back to `complete`.

use crate::classifier::IntentClassifier;
use crate::config::ContinuationConfig;
use crate::models::{AgentId, TurnInput};
use crate::session::{AgentResponse, ReplyIntent, SessionState, SessionTracker};
use crate::state::SessionStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// How the turn relates to the pending action held in session state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// Nothing was pending
    Fresh,
    /// A short reply answering the previous turn
    Continued { intent: ReplyIntent },
    /// An ordinary message arrived while an action was pending
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingDecision {
    pub agent: AgentId,
    pub disposition: Disposition,
    /// Auxiliary context for the chosen agent; empty when there is none
    pub instruction: String,
}

pub struct TurnRouter {
    classifier: IntentClassifier,
    tracker: SessionTracker,
    store: Box<dyn SessionStore>,
}

impl TurnRouter {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self::with_config(store, ContinuationConfig::default())
    }

    pub fn with_config(store: Box<dyn SessionStore>, continuation: ContinuationConfig) -> Self {
        Self {
            classifier: IntentClassifier::with_config(continuation.clone()),
            tracker: SessionTracker::with_config(continuation),
            store,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Pick the agent for this turn from the input and the current state.
    pub fn decide(&self, input: &TurnInput, state: &SessionState) -> RoutingDecision {
        if let Some(resolution) =
            self.tracker
                .resolve_turn(&input.message, &input.history, state)
        {
            return RoutingDecision {
                agent: resolution.agent,
                disposition: Disposition::Continued {
                    intent: resolution.intent,
                },
                instruction: self
                    .tracker
                    .instruction_for_turn(state, Some(resolution.intent)),
            };
        }

        let agent = self
            .classifier
            .classify(&input.message, input.capabilities, &input.history);

        if let Some(action) = &state.pending_action {
            // The stale action must not steer the newly chosen agent.
            debug!(action = action.kind(), agent = %agent, "Pending action abandoned");
            return RoutingDecision {
                agent,
                disposition: Disposition::Abandoned,
                instruction: String::new(),
            };
        }

        RoutingDecision {
            agent,
            disposition: Disposition::Fresh,
            instruction: self.tracker.instruction_for(state),
        }
    }

    /// Apply a finished turn to `state`.
    pub fn apply_outcome(
        &self,
        state: &mut SessionState,
        decision: &RoutingDecision,
        response: &AgentResponse,
    ) {
        match decision.disposition {
            Disposition::Continued {
                intent: ReplyIntent::Accept | ReplyIntent::Decline,
            }
            | Disposition::Abandoned => state.clear_pending(),
            Disposition::Continued {
                intent: ReplyIntent::Recommend,
            }
            | Disposition::Fresh => {}
        }

        state.record_turn(decision.agent);
        state.apply(self.tracker.extract(response));
    }

    /// Route a turn against the persisted state of `conversation_id`.
    pub async fn route(&self, conversation_id: Uuid, input: &TurnInput) -> RoutingDecision {
        let state = self.load_state(conversation_id).await;
        let decision = self.decide(input, &state);

        debug!(
            %conversation_id,
            agent = %decision.agent,
            disposition = ?decision.disposition,
            "Turn routed"
        );

        decision
    }

    /// Merge the agent's response into persisted state and return the result.
    ///
    /// Persistence is auxiliary: a failed save is logged and the merged state
    /// is still returned.
    pub async fn complete(
        &self,
        conversation_id: Uuid,
        decision: &RoutingDecision,
        response: &AgentResponse,
    ) -> SessionState {
        let mut state = self.load_state(conversation_id).await;
        self.apply_outcome(&mut state, decision, response);

        if let Err(error) = self.store.save(conversation_id, &state).await {
            warn!(
                %conversation_id,
                "Session state save failed, next turn starts from stale state: {}",
                error
            );
        }

        state
    }

    async fn load_state(&self, conversation_id: Uuid) -> SessionState {
        match self.store.load(conversation_id).await {
            Ok(state) => state,
            Err(error) => {
                warn!(
                    %conversation_id,
                    "Session state load failed, continuing without persisted context: {}",
                    error
                );
                SessionState::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use crate::models::{Capabilities, HistoryEntry};
    use crate::session::{MentionContext, Outcome, PendingAction, StateSignal};
    use crate::state::InMemorySessionStore;
    use crate::Result;

    fn router() -> TurnRouter {
        TurnRouter::new(Box::new(InMemorySessionStore::new()))
    }

    fn budget_offer() -> AgentResponse {
        let content = "Você gastou R$ 800 em mercado. Quer que eu crie um orçamento?";
        AgentResponse::new(AgentId::Cfo, content).with_signal(StateSignal::Pending {
            action: PendingAction::CreateBudget {
                category: Some("mercado".to_string()),
                amount: None,
            },
            question: Some("Quer que eu crie um orçamento?".to_string()),
            context: Some(MentionContext::scan(content)),
        })
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl SessionStore for FailingStore {
        async fn load(&self, _: Uuid) -> Result<SessionState> {
            Err(RouterError::DatabaseError("offline".to_string()))
        }
        async fn save(&self, _: Uuid, _: &SessionState) -> Result<()> {
            Err(RouterError::DatabaseError("offline".to_string()))
        }
        async fn clear(&self, _: Uuid) -> Result<()> {
            Err(RouterError::DatabaseError("offline".to_string()))
        }
    }

    #[test]
    fn test_decide_fresh_turn() {
        let router = router();
        let decision = router.decide(&TurnInput::new("gastei 50 no mercado"), &SessionState::default());

        assert_eq!(decision.agent, AgentId::Registrar);
        assert_eq!(decision.disposition, Disposition::Fresh);
        assert!(decision.instruction.is_empty());
    }

    #[test]
    fn test_decide_short_reply_after_question() {
        let router = router();
        let input = TurnInput::new("sim").with_history(vec![HistoryEntry::assistant(
            "Quer que eu te ajude a montar um orçamento?",
        )]);

        let decision = router.decide(&input, &SessionState::default());
        assert_eq!(decision.agent, AgentId::Cfo);
        assert_eq!(
            decision.disposition,
            Disposition::Continued {
                intent: ReplyIntent::Accept
            }
        );
        assert!(decision.instruction.contains("CONFIRMOU"));
    }

    #[test]
    fn test_decide_image_turn() {
        let router = router();
        let input = TurnInput::new("").with_capabilities(Capabilities::with_image());
        let decision = router.decide(&input, &SessionState::default());
        assert_eq!(decision.agent, AgentId::RegistrarVision);
    }

    #[tokio::test]
    async fn test_budget_offer_accepted() {
        let router = router();
        let conversation_id = Uuid::new_v4();

        let first = router.route(conversation_id, &TurnInput::new("como estou?")).await;
        assert_eq!(first.agent, AgentId::Cfo);
        let state = router.complete(conversation_id, &first, &budget_offer()).await;
        assert!(!state.is_idle());
        assert_eq!(state.turn_count, 1);

        // History-free short reply still resolves against the persisted action
        let second = router.route(conversation_id, &TurnInput::new("bora")).await;
        assert_eq!(second.agent, AgentId::Cfo);
        assert!(second.instruction.contains("\"mercado\""));
        assert!(second.instruction.contains("orçamento sugerido"));

        let done = AgentResponse::new(AgentId::Cfo, "Orçamento criado!");
        let state = router.complete(conversation_id, &second, &done).await;
        assert!(state.is_idle());
        assert_eq!(state.turn_count, 2);
        assert_eq!(state.context.last_mentioned_value, Some(800.0));
    }

    #[tokio::test]
    async fn test_pending_action_abandoned_by_new_message() {
        let router = router();
        let conversation_id = Uuid::new_v4();

        let first = router.route(conversation_id, &TurnInput::new("resumo")).await;
        router.complete(conversation_id, &first, &budget_offer()).await;

        let second = router
            .route(conversation_id, &TurnInput::new("o que é CDI?"))
            .await;
        assert_eq!(second.agent, AgentId::Educator);
        assert_eq!(second.disposition, Disposition::Abandoned);
        assert!(second.instruction.is_empty());

        let answer = AgentResponse::new(AgentId::Educator, "CDI é ...");
        let state = router.complete(conversation_id, &second, &answer).await;
        assert!(state.is_idle());
        assert_eq!(state.last_agent, Some(AgentId::Educator));
    }

    #[tokio::test]
    async fn test_recommendation_keeps_pending_action() {
        let router = router();
        let conversation_id = Uuid::new_v4();

        let first = router.route(conversation_id, &TurnInput::new("resumo")).await;
        router.complete(conversation_id, &first, &budget_offer()).await;

        let second = router
            .route(conversation_id, &TurnInput::new("o que você indica?"))
            .await;
        assert_eq!(
            second.disposition,
            Disposition::Continued {
                intent: ReplyIntent::Recommend
            }
        );

        let advice = AgentResponse::new(AgentId::Cfo, "Sugiro R$ 600 para mercado.");
        let state = router.complete(conversation_id, &second, &advice).await;
        assert!(!state.is_idle());
    }

    #[tokio::test]
    async fn test_agent_resolves_its_own_action() {
        let router = router();
        let conversation_id = Uuid::new_v4();

        let first = router.route(conversation_id, &TurnInput::new("resumo")).await;
        router.complete(conversation_id, &first, &budget_offer()).await;

        // "me ajuda" keeps the action open, the agent then reports completion
        let second = router.route(conversation_id, &TurnInput::new("me ajuda")).await;
        let response = AgentResponse::new(AgentId::Cfo, "Pronto!").with_signal(StateSignal::Resolved {
            outcome: Outcome::Completed,
        });
        let state = router.complete(conversation_id, &second, &response).await;
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_idle_state() {
        let router = TurnRouter::new(Box::new(FailingStore));
        let conversation_id = Uuid::new_v4();

        let decision = router.route(conversation_id, &TurnInput::new("sim")).await;
        assert_eq!(decision.agent, AgentId::Cfo);
        assert_eq!(decision.disposition, Disposition::Fresh);

        let state = router
            .complete(conversation_id, &decision, &budget_offer())
            .await;
        assert!(!state.is_idle());
    }
}
