//! Intent Classifier
//!
//! Maps a user message (plus capabilities and prior turns) to exactly one agent:
//! - RegistrarVision: an image is attached
//! - (continuation): a short reply inherits the agent of the pending question
//! - Registrar: "gastei 100 no mercado", "50 mercado", "R$50 ifood"
//! - Guardian: "posso gastar 200?", "cabe no orçamento?"
//! - Cfo: "como estou?", "quanto gastei em 2025"
//! - Educator: "o que é CDI?", "vale a pena investir em ações?"
//! - Cfo again as the default for anything else
//!
//! Rules are evaluated in order on the normalised text, first match wins.

use crate::config::ContinuationConfig;
use crate::models::{AgentId, Capabilities, HistoryEntry};
use crate::session::continuation::{open_question, reply_intent};
use crate::text::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Merchant and category words that make "uber 23,90" or "mercado 150" a transaction
const MERCHANT_WORDS: &[&str] = &[
    // Food
    "mercado", "supermercado", "feira", "padaria", "açougue", "restaurante",
    "lanche", "almoço", "almoco", "jantar", "café", "cafe", "pizza", "bar",
    "ifood", "delivery",
    // Transport
    "uber", "taxi", "táxi", "gasolina", "combustível", "combustivel",
    "estacionamento", "ônibus", "onibus", "metrô", "metro",
    // Home & bills
    "aluguel", "condomínio", "condominio", "luz", "água", "agua", "internet",
    "celular", "gás",
    // Health & leisure
    "farmácia", "farmacia", "médico", "medico", "dentista", "academia",
    "cinema", "netflix", "spotify", "viagem", "hotel", "shopping", "roupa",
    "roupas", "presente", "pet",
    // Income
    "salário", "salario", "freela", "pix",
];

lazy_static! {
    static ref CURRENCY: Regex =
        Regex::new(r"(?:r\$|us\$|\$|€)\s*\d|\d\s*(?:reais|real)\b").unwrap();
    static ref TRANSACTION_VERB: Regex = Regex::new(
        r"\b(?:gastei|paguei|comprei|recebi|ganhei|transferi|depositei|torrei)\b"
    ).unwrap();
    static ref AMOUNT: Regex = Regex::new(r"\d+(?:[.,]\d+)*").unwrap();
    static ref YEAR_REFERENCE: Regex =
        Regex::new(r"\b(em|de|do|no|meu|ano)\s+(?:19|20)\d{2}\b").unwrap();
    static ref LEADING_AMOUNT: Regex =
        Regex::new(r"^\d+(?:[.,]\d+)*\s+(?:(?:de|no|na|em|com)\s+)?(\w+)").unwrap();
    static ref LEADING_MERCHANT: Regex = Regex::new(r"^(\w+)\s+\d+(?:[.,]\d+)*\b").unwrap();

    static ref SPENDING_PERMISSION: Regex = Regex::new(concat!(
        r"\b(?:posso|consigo) (?:gastar|comprar|pagar|sair|viajar)\b",
        r"|\bd[aá] (?:pra|para) (?:comprar|gastar|pagar|sair|viajar)\b",
        r"|\bcabe no (?:meu )?or[çc]amento\b",
        r"|\btenho (?:dinheiro|grana|saldo|limite) (?:pra|para)\b",
        r"|\bquero (?:gastar|comprar)\b",
    )).unwrap();

    static ref FINANCIAL_ANALYSIS: Regex = Regex::new(concat!(
        r"\bcomo (?:estou|est[aã]o|anda|andam|foi|foram|fiquei|terminei)\b",
        r"|\bresum[oe]\b|\bresumir\b",
        r"|\bquanto (?:gastei|recebi|ganhei|economizei|sobrou|sobra|tenho|devo)\b",
        r"|\bonde (?:mais )?(?:gasto|gastei|estou gastando)\b",
        r"|\bsaldo\b",
        r"|\bminhas finan[çc]as\b",
        r"|\bmeus (?:gastos|investimentos|números|numeros)\b",
        r"|\bno vermelho\b",
        r"|\bbalan[çc]o\b|\bextrato\b|\brelat[óo]rio\b",
        r"|\b(?:em|de|meu|ano de)\s+(?:19|20)\d{2}\b",
    )).unwrap();

    static ref EDUCATIONAL: Regex = Regex::new(concat!(
        r"\bo que (?:é|e|são|sao|significa|quer dizer)\b",
        r"|\bsignifica\b",
        r"|\bcomo funcionam?\b",
        r"|\bme expli(?:ca|que)\b",
        r"|\bqual (?:é )?a diferen[çc]a\b",
        r"|\b(?:pra|para) que serve\b",
        r"|\bvale a pena\b",
        r"|\bdefini[çc][ãa]o de\b",
    )).unwrap();

    static ref DEFAULT_CLASSIFIER: IntentClassifier = IntentClassifier::new();
}

/// What a single rule sees
pub struct RuleInput<'a> {
    /// Normalised message text
    pub text: &'a str,
    pub capabilities: Capabilities,
    pub history: &'a [HistoryEntry],
    pub continuation: &'a ContinuationConfig,
}

/// Where a matching rule sends the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Agent(AgentId),
    /// The agent implied by the pending question in the last assistant turn
    PendingQuestion,
}

/// One `(predicate, agent)` entry of the routing table
pub struct Rule {
    pub name: &'static str,
    pub predicate: fn(&RuleInput<'_>) -> bool,
    pub target: Target,
}

impl Rule {
    pub fn route(&self, input: &RuleInput<'_>) -> Option<AgentId> {
        if !(self.predicate)(input) {
            return None;
        }
        match self.target {
            Target::Agent(agent) => Some(agent),
            Target::PendingQuestion => open_question(input.history).map(|q| q.agent()),
        }
    }
}

/// Routing table in precedence order
pub const RULES: &[Rule] = &[
    Rule {
        name: "image",
        predicate: has_image,
        target: Target::Agent(AgentId::RegistrarVision),
    },
    Rule {
        name: "continuation",
        predicate: is_continuation,
        target: Target::PendingQuestion,
    },
    Rule {
        name: "transaction",
        predicate: is_transaction,
        target: Target::Agent(AgentId::Registrar),
    },
    Rule {
        name: "spending_permission",
        predicate: is_spending_permission,
        target: Target::Agent(AgentId::Guardian),
    },
    Rule {
        name: "financial_analysis",
        predicate: is_financial_analysis,
        target: Target::Agent(AgentId::Cfo),
    },
    Rule {
        name: "educational",
        predicate: is_educational,
        target: Target::Agent(AgentId::Educator),
    },
];

fn has_image(input: &RuleInput<'_>) -> bool {
    input.capabilities.has_image
}

fn is_continuation(input: &RuleInput<'_>) -> bool {
    reply_intent(input.continuation, input.text).is_some() && open_question(input.history).is_some()
}

/// Amount present once year references ("em 2025", "meu 2024") are removed
fn has_amount(text: &str) -> bool {
    let without_years = YEAR_REFERENCE.replace_all(text, "$1");
    AMOUNT.is_match(&without_years)
}

/// "mercado 50" and "50 mercado" count only when the word is a known merchant
fn leading_word_is_merchant(pattern: &Regex, text: &str) -> bool {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|word| MERCHANT_WORDS.contains(&word.as_str()))
        .unwrap_or(false)
}

fn is_transaction(input: &RuleInput<'_>) -> bool {
    let text = input.text;
    CURRENCY.is_match(text)
        || (TRANSACTION_VERB.is_match(text) && has_amount(text))
        || leading_word_is_merchant(&LEADING_AMOUNT, text)
        || leading_word_is_merchant(&LEADING_MERCHANT, text)
}

fn is_spending_permission(input: &RuleInput<'_>) -> bool {
    SPENDING_PERMISSION.is_match(input.text)
}

fn is_financial_analysis(input: &RuleInput<'_>) -> bool {
    FINANCIAL_ANALYSIS.is_match(input.text)
}

fn is_educational(input: &RuleInput<'_>) -> bool {
    EDUCATIONAL.is_match(input.text)
}

/// Intent classifier
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    continuation: ContinuationConfig,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(continuation: ContinuationConfig) -> Self {
        Self { continuation }
    }

    /// Classify a message into exactly one agent. Never fails.
    pub fn classify(
        &self,
        message: &str,
        capabilities: Capabilities,
        history: &[HistoryEntry],
    ) -> AgentId {
        match self.matching_rule(message, capabilities, history) {
            Some((rule, agent)) => {
                debug!(rule = rule.name, agent = %agent, "Message routed");
                agent
            }
            None => {
                debug!(agent = %AgentId::DEFAULT, "No rule matched, using default agent");
                AgentId::DEFAULT
            }
        }
    }

    /// First rule that routes the message, with its agent
    pub fn matching_rule(
        &self,
        message: &str,
        capabilities: Capabilities,
        history: &[HistoryEntry],
    ) -> Option<(&'static Rule, AgentId)> {
        let text = normalize(message);
        let input = RuleInput {
            text: &text,
            capabilities,
            history,
            continuation: &self.continuation,
        };

        RULES
            .iter()
            .find_map(|rule| rule.route(&input).map(|agent| (rule, agent)))
    }
}

/// Classify with the default continuation vocabulary
pub fn classify(message: &str, capabilities: Capabilities, history: &[HistoryEntry]) -> AgentId {
    DEFAULT_CLASSIFIER.classify(message, capabilities, history)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(message: &str) -> AgentId {
        classify(message, Capabilities::default(), &[])
    }

    fn rule_name(message: &str) -> Option<&'static str> {
        IntentClassifier::new()
            .matching_rule(message, Capabilities::default(), &[])
            .map(|(rule, _)| rule.name)
    }

    #[test]
    fn test_transactions() {
        let cases = vec![
            "50 mercado",
            "gastei 100 no restaurante",
            "paguei 200 de luz",
            "uber 23,90",
            "recebi 5000 de salário",
            "mercado 150",
            "R$50 ifood",
            "comprei 80 reais de gasolina",
            "gastei R$50,00 no café ☕",
        ];

        for c in cases {
            assert_eq!(route(c), AgentId::Registrar, "{}", c);
        }
    }

    #[test]
    fn test_leading_number_needs_a_merchant() {
        assert_eq!(rule_name("50 no mercado"), Some("transaction"));
        assert_eq!(rule_name("35 de gasolina"), Some("transaction"));

        assert_eq!(route("2025 foi um bom ano?"), AgentId::Cfo);
        assert_eq!(rule_name("2025 foi um bom ano?"), None);
        assert_eq!(route("3 dicas pra economizar"), AgentId::Cfo);
        assert_eq!(route("2 dúvidas: o que é CDI?"), AgentId::Educator);
    }

    #[test]
    fn test_financial_analysis() {
        let cases = vec![
            "como estou?",
            "como estou esse mês?",
            "resume meu mês",
            "quanto gastei?",
            "onde mais gasto?",
            "meus gastos",
            "minhas finanças",
            "estou no vermelho?",
            "saldo",
            "como foi meu 2024",
            "quanto gastei em 2025",
        ];

        for c in cases {
            assert_eq!(route(c), AgentId::Cfo, "{}", c);
            assert_eq!(rule_name(c), Some("financial_analysis"), "{}", c);
        }
    }

    #[test]
    fn test_spending_permission() {
        let cases = vec![
            "posso gastar 200?",
            "dá pra comprar um celular?",
            "tenho dinheiro pra sair?",
            "cabe no orçamento?",
            "quero gastar 500",
        ];

        for c in cases {
            assert_eq!(route(c), AgentId::Guardian, "{}", c);
        }
    }

    #[test]
    fn test_educational() {
        let cases = vec![
            "o que é CDI?",
            "como funciona o tesouro direto?",
            "me explica inflação",
            "qual a diferença entre CDB e LCI?",
            "o que significa selic?",
            "pra que serve reserva de emergência?",
            "vale a pena investir em ações?",
        ];

        for c in cases {
            assert_eq!(route(c), AgentId::Educator, "{}", c);
        }
    }

    #[test]
    fn test_image_wins_over_text() {
        for message in ["", "gastei 100 no mercado", "o que é CDI?", "sim"] {
            let history = vec![HistoryEntry::assistant("Quer detalhes?")];
            assert_eq!(
                classify(message, Capabilities::with_image(), &history),
                AgentId::RegistrarVision
            );
        }
    }

    #[test]
    fn test_continuation() {
        let history = vec![HistoryEntry::assistant(
            "Quer que eu te ajude a montar um orçamento?",
        )];
        assert_eq!(classify("sim", Capabilities::default(), &history), AgentId::Cfo);

        let history = vec![HistoryEntry::assistant(
            "Você gastou R$5000 esse mês. Quer detalhes?",
        )];
        assert_eq!(classify("quero", Capabilities::default(), &history), AgentId::Cfo);

        let history = vec![HistoryEntry::assistant(
            "Seus gastos estão altos em restaurante.",
        )];
        assert_eq!(
            classify("o que você indica?", Capabilities::default(), &history),
            AgentId::Cfo
        );

        let history = vec![HistoryEntry::assistant("Quer que eu registre R$50 em Mercado?")];
        assert_eq!(classify("pode", Capabilities::default(), &history), AgentId::Registrar);
    }

    #[test]
    fn test_default_agent() {
        for c in ["olá", "oi", "ajuda", "", "   ", "👋"] {
            assert_eq!(route(c), AgentId::Cfo, "{:?}", c);
            assert_eq!(rule_name(c), None, "{:?}", c);
        }
    }

    #[test]
    fn test_rule_order_is_significant() {
        assert_eq!(rule_name("gastei 100, posso gastar mais?"), Some("transaction"));
        assert_eq!(rule_name("posso gastar mais? quanto sobra?"), Some("spending_permission"));
        assert_eq!(rule_name("como estou? o que é CDI?"), Some("financial_analysis"));
    }

    #[test]
    fn test_normalisation() {
        assert_eq!(route("GASTEI 100 NO MERCADO"), route("gastei 100 no mercado"));
        assert_eq!(route("   como   estou   ?   "), AgentId::Cfo);
        assert_eq!(route("  gastei\t100   no  mercado "), AgentId::Registrar);
        assert_eq!(route("O QUE É CDI?"), AgentId::Educator);
    }

    #[test]
    fn test_long_repeated_message() {
        let long_message = "gastei 100 no mercado ".repeat(100);
        assert_eq!(route(&long_message), AgentId::Registrar);

        let long_question = "o que é CDI? ".repeat(100);
        assert_eq!(route(&long_question), AgentId::Educator);
    }
}
