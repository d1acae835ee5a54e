//! Sojourn binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration (file, env, CLI)
//! 2. Initialise tracing
//! 3. Read credentials and build the index and completion clients
//! 4. Build the answer engine and turn router
//! 5. Run an interactive loop over stdin until `/quit` or EOF

mod cli;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use sojourn_chat::{display_sources, ChatError, ChatRouter, SessionState, TurnOutput};
use sojourn_core::config::{Credentials, SojournConfig};
use sojourn_rag::{AnswerEngine, HttpCompletionClient, LlamaCloudIndex};

use cli::CliArgs;

const GREETING: &str = "Hi! Ask me about work passes, remittance, savings, or scams. \
                        Type /clear to start over or /quit to exit.";

const FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while answering. Please try again in a moment.";

/// Print one turn's reply, its grounding label and its sources.
fn render(output: &TurnOutput) -> String {
    let mut text = output.display_text.clone();
    let label = output.grounding_label.as_str();
    if !label.is_empty() {
        text.push_str(&format!("\n\n_{}_", label));
    }
    let sources = display_sources(&output.sources);
    if !sources.is_empty() {
        text.push_str(&format!("\nSources: {}", sources.join(", ")));
    }
    text
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config: file, then env, then CLI.
    let config_file = args.resolve_config_path();
    let loaded = SojournConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => SojournConfig::default(),
    };
    config.apply_env_overrides();
    config.retrieval.top_k = args.resolve_top_k(config.retrieval.top_k);
    config.answer.translate_queries =
        args.resolve_translate_queries(config.answer.translate_queries);

    // Tracing. RUST_LOG wins over the configured level.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Sojourn v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Using default configuration"
        ),
    }
    tracing::info!(
        index = %config.retrieval.index_name,
        top_k = config.retrieval.top_k,
        model = %config.completion.model,
        translate_queries = config.answer.translate_queries,
        "Effective settings"
    );

    // Services.
    let credentials = match Credentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Missing credentials");
            return Err(e.into());
        }
    };
    let index = LlamaCloudIndex::new(
        &config.retrieval,
        credentials.index_api_key.clone(),
        credentials.organization_id.clone(),
    )?;
    let completion =
        HttpCompletionClient::new(&config.completion, credentials.completion_api_key.clone())?;
    tracing::info!(endpoint = %completion.endpoint(), "Completion client ready");

    let engine = AnswerEngine::new(Arc::new(index), Arc::new(completion), &config);
    let router = ChatRouter::new(engine, &config.chat);
    let mut session = SessionState::new();

    // === Interactive loop ===

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(format!("{}\n\n> ", GREETING).as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let reply = match line.trim() {
            "/quit" => break,
            "/clear" => {
                session.clear();
                "Chat cleared.".to_string()
            }
            text => match router.process_turn(&mut session, text).await {
                Ok(output) => render(&output),
                Err(ChatError::EmptyMessage) => String::new(),
                Err(e @ ChatError::MessageTooLong(_)) => e.to_string(),
                Err(e) => {
                    tracing::error!(error = %e, "Turn failed");
                    FAILURE_MESSAGE.to_string()
                }
            },
        };

        if !reply.is_empty() {
            stdout.write_all(format!("{}\n\n", reply).as_bytes()).await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    tracing::info!(session = %session.id, turns = session.transcript.len(), "Session ended");
    Ok(())
}
