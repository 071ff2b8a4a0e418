//! Short replies and the pending questions they answer
//!
//! A short reply ("sim", "quero", "o que você indica?") carries no intent of
//! its own. It inherits the agent of the question the assistant asked in the
//! immediately preceding turn.

use crate::config::ContinuationConfig;
use crate::models::{last_assistant_message, AgentId, HistoryEntry};
use crate::text::{normalize, short_reply_form};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a short reply means relative to the pending question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyIntent {
    Accept,
    Decline,
    Recommend,
}

/// Shapes of assistant questions that leave the conversation waiting on the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingQuestion {
    RegisterTransaction,
    ChooseCategory,
    ExplainConcept,
    GoalOffer,
    BudgetOffer,
    MoreDetail,
    Offer,
}

impl PendingQuestion {
    /// Agent that continues the exchange after a short reply
    pub fn agent(&self) -> AgentId {
        match self {
            PendingQuestion::RegisterTransaction | PendingQuestion::ChooseCategory => {
                AgentId::Registrar
            }
            PendingQuestion::ExplainConcept => AgentId::Educator,
            PendingQuestion::GoalOffer
            | PendingQuestion::BudgetOffer
            | PendingQuestion::MoreDetail
            | PendingQuestion::Offer => AgentId::Cfo,
        }
    }
}

lazy_static! {
    // Domain nouns before bare confirmation verbs: "salve esse orçamento" is a
    // budget follow-up, not a transaction. `Offer` catches generic phrasings.
    static ref QUESTION_SHAPES: Vec<(PendingQuestion, Regex)> = vec![
        (
            PendingQuestion::ExplainConcept,
            Regex::new(r"quer que eu (?:explique|te explique)|explicar (?:melhor|mais)|quer entender (?:melhor|mais)").unwrap(),
        ),
        (
            PendingQuestion::GoalOffer,
            Regex::new(concat!(
                r"\b(?:criar|definir|estabelecer|montar)\b[^.?!]*\b(?:meta|objetivo)",
                r"|\b(?:salve|salvar|anote|anotar|registre|registrar|guarde|guardar)\s+(?:\w+\s+){0,3}(?:meta|objetivo)\b",
            )).unwrap(),
        ),
        (
            PendingQuestion::BudgetOffer,
            Regex::new(concat!(
                r"\b(?:criar|montar|definir|configurar|fazer|ajustar)\b[^.?!]*\bor[çc]amento",
                r"|\b(?:salve|salvar|anote|anotar|registre|registrar|guarde|guardar)\s+(?:\w+\s+){0,3}or[çc]amento",
                r"|definir (?:um |o )?limite|quer que eu (?:defina|crie)",
            )).unwrap(),
        ),
        (
            PendingQuestion::RegisterTransaction,
            Regex::new(
                r"quer que eu (?:registre|anote|salve|lance)|posso (?:registrar|anotar|lançar|lancar)|pode confirmar|confirma (?:o|a|esse|essa) (?:registro|lançamento|lancamento|transação|transacao)"
            ).unwrap(),
        ),
        (
            PendingQuestion::ChooseCategory,
            Regex::new(r"qual categoria|escolher (?:a )?categoria|categoria certa").unwrap(),
        ),
        (
            PendingQuestion::MoreDetail,
            Regex::new(r"quer (?:mais )?detalhes|quer saber mais|posso detalhar|quer que eu detalhe|quer ver (?:o|os|a|as|mais)\b").unwrap(),
        ),
        (
            PendingQuestion::Offer,
            Regex::new(r"quer que eu|gostaria (?:de|que)|prefere|o que acha|devo (?:continuar|prosseguir)|posso (?:criar|definir)").unwrap(),
        ),
    ];
}

/// Intent of `message` if it is one of the configured short replies.
pub fn reply_intent(config: &ContinuationConfig, message: &str) -> Option<ReplyIntent> {
    let form = short_reply_form(message);
    if form.is_empty() {
        return None;
    }

    let listed = |tokens: &[String]| tokens.iter().any(|t| short_reply_form(t) == form);

    if listed(&config.affirmative) {
        Some(ReplyIntent::Accept)
    } else if listed(&config.negative) {
        Some(ReplyIntent::Decline)
    } else if listed(&config.recommendation) {
        Some(ReplyIntent::Recommend)
    } else {
        None
    }
}

/// Pending question asked by an assistant message, if any.
pub fn pending_question(assistant_message: &str) -> Option<PendingQuestion> {
    let text = normalize(assistant_message);
    QUESTION_SHAPES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&text))
        .map(|(question, _)| *question)
}

/// Pending question left open by the last history entry.
pub fn open_question(history: &[HistoryEntry]) -> Option<PendingQuestion> {
    last_assistant_message(history).and_then(pending_question)
}
