use dotenv::dotenv;
use finance_agent_router::{
    build_store, conversation_id,
    session::{MentionContext, Outcome},
    AgentId, AgentResponse, Capabilities, HistoryEntry, PendingAction, StateSignal, StoreConfig,
    TurnInput, TurnRouter,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One scripted user turn and the reply the chosen agent would give
struct ScriptedTurn {
    message: &'static str,
    has_image: bool,
    reply: fn(AgentId) -> AgentResponse,
}

fn budget_offer(agent: AgentId) -> AgentResponse {
    let content = "Você gastou R$ 1.250 este mês, R$ 800 em mercado. Quer que eu crie um orçamento?";
    AgentResponse::new(agent, content).with_signal(StateSignal::Pending {
        action: PendingAction::CreateBudget {
            category: Some("mercado".to_string()),
            amount: None,
        },
        question: Some("Quer que eu crie um orçamento?".to_string()),
        context: Some(MentionContext::scan(content)),
    })
}

fn budget_created(agent: AgentId) -> AgentResponse {
    AgentResponse::new(agent, "Pronto! Orçamento de R$ 700 para mercado criado.").with_signal(
        StateSignal::Resolved {
            outcome: Outcome::Accepted,
        },
    )
}

fn registered(agent: AgentId) -> AgentResponse {
    AgentResponse::new(agent, "Registrei R$ 50 em Mercado.")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Finance agent router starting");

    let config = StoreConfig::from_env()?;
    let router = TurnRouter::new(build_store(&config));

    let script = [
        ScriptedTurn {
            message: "como estou esse mês?",
            has_image: false,
            reply: budget_offer,
        },
        ScriptedTurn {
            message: "sim",
            has_image: false,
            reply: budget_created,
        },
        ScriptedTurn {
            message: "50 mercado",
            has_image: false,
            reply: registered,
        },
        ScriptedTurn {
            message: "",
            has_image: true,
            reply: registered,
        },
    ];

    let id = conversation_id(None, "demo-conversation");
    let mut history: Vec<HistoryEntry> = Vec::new();

    for turn in script {
        let capabilities = Capabilities {
            has_image: turn.has_image,
        };
        let input = TurnInput::new(turn.message)
            .with_capabilities(capabilities)
            .with_history(history.clone());

        let decision = router.route(id, &input).await;
        let response = (turn.reply)(decision.agent);
        let state = router.complete(id, &decision, &response).await;

        println!("\n> {}", if turn.has_image { "[imagem]" } else { turn.message });
        println!("  agent: {} ({:?})", decision.agent, decision.disposition);
        if !decision.instruction.is_empty() {
            println!("  instruction:\n{}", decision.instruction);
        }
        println!("  reply: {}", response.content);
        println!("  pending: {}", serde_json::to_string(&state.pending_action)?);

        history.push(HistoryEntry::user(turn.message));
        history.push(HistoryEntry::assistant(response.content));
    }

    Ok(())
}
