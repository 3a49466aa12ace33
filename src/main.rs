use agent_invoker::agent::crew::{Crew, CrewAgent, CrewTask};
use agent_invoker::agent::graph::{GraphAgent, GraphState};
use agent_invoker::agent::prompt::PromptAgent;
use agent_invoker::agent::{Persona, Query};
use agent_invoker::config::{Config, CredentialPolicy};
use agent_invoker::llm::{LlmClient, Provider};
use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG: &str = "agent.toml";

#[derive(Parser)]
#[command(
    name = "agent-invoker",
    version,
    about = "Ask a hosted LLM agent one question and print its answer"
)]
struct Cli {
    /// Path to config file [default: agent.toml, if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// LLM provider override: openai, anthropic, openrouter
    #[arg(long, global = true)]
    provider: Option<Provider>,

    /// LLM model override
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Single system prompt + question; prints the answer (default)
    Ask {
        /// System prompt describing the assistant
        #[arg(long)]
        persona: Option<String>,

        /// Question to ask
        #[arg(long)]
        query: Option<String>,
    },

    /// Role/goal/backstory agent running one task; prints the task output
    Crew {
        /// Question passed to the task as input
        #[arg(long)]
        question: Option<String>,
    },

    /// Message-state agent; prints the full message envelope as JSON
    Graph {
        /// User message
        #[arg(long)]
        question: Option<String>,
    },

    /// Like `graph`, but stops before any request if the API key is not set
    GraphChecked {
        /// User message
        #[arg(long)]
        question: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("agent_invoker=warn")),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_optional(Path::new(DEFAULT_CONFIG))?,
    };
    cfg.llm.apply_override(cli.provider, cli.model);

    let command = cli.command.unwrap_or(Command::Ask {
        persona: None,
        query: None,
    });

    let policy = match command {
        Command::GraphChecked { .. } => CredentialPolicy::Required,
        _ => cfg.llm.credential_policy(),
    };
    let llm = LlmClient::from_config(&cfg.llm, policy)?;
    info!(provider = %cfg.llm.provider, model = %cfg.llm.model(), "LLM client ready");

    match command {
        Command::Ask { persona, query } => {
            let persona = Persona::new(persona.unwrap_or(cfg.agent.persona))?;
            let query = Query::new(query.unwrap_or(cfg.agent.query))?;
            let result = PromptAgent::new(llm, persona).run(&query).await?;
            println!("{}", result.output);
        }
        Command::Crew { question } => {
            let crew_cfg = cfg.crew;
            let agent = CrewAgent {
                role: crew_cfg.role,
                goal: crew_cfg.goal,
                backstory: crew_cfg.backstory,
            };
            let task = CrewTask {
                description: crew_cfg.task,
                expected_output: crew_cfg.expected_output,
            };
            let inputs = BTreeMap::from([(
                "question".to_string(),
                question.unwrap_or(crew_cfg.question),
            )]);
            let output = Crew::new(llm, agent, task).kickoff(&inputs).await?;
            println!("{}", output.raw);
        }
        Command::Graph { question } | Command::GraphChecked { question } => {
            let prompt = Persona::new(cfg.graph.prompt)?;
            let state = GraphState::with_user_message(question.unwrap_or(cfg.graph.question));
            let state = GraphAgent::new(llm, prompt).invoke(state).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
