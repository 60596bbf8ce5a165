//! Colloquy application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. `serve`: run the reference conversation server over an in-memory backend
//! 3. `chat`: run the terminal front end against a conversation server

mod cli;
mod session;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;

use colloquy_api::AppState;
use colloquy_chat::{lock_store, Reconciler, SessionStore};
use colloquy_core::ColloquyConfig;
use colloquy_remote::HttpConversationService;

use cli::{CliArgs, Command};
use session::{parse_command, ChatSession, Step};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ColloquyConfig::load_or_default(&config_file);

    // Tracing. Logs go to stderr so they stay out of the transcript.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Colloquy v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    match args.command {
        Command::Serve { .. } => {
            config.server.port = args.resolve_port(config.server.port);
            config.server.host = args.resolve_host(&config.server.host);
            let state = AppState::in_memory(config.clone());
            if let Err(e) = colloquy_api::start_server(&config, state).await {
                tracing::error!(error = %e, "Conversation server failed");
                return Err(e.into());
            }
        }
        Command::Chat { .. } => {
            config.remote.base_url = args.resolve_url(&config.remote.base_url);
            run_chat(config).await?;
        }
    }

    tracing::info!("Colloquy stopped");
    Ok(())
}

/// Terminal front end: reads commands from stdin, prints transcript
/// updates as store events arrive, and runs sends in the background.
async fn run_chat(config: ColloquyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = HttpConversationService::new(&config.remote)?;
    if let Err(e) = service.health().await {
        tracing::warn!(url = %service.base_url(), error = %e, "Conversation server not reachable yet");
    }

    let store = SessionStore::shared();
    let mut events = lock_store(&store).subscribe();
    let reconciler = Reconciler::new(store, Arc::new(service), config.chat.clone());
    let mut session = ChatSession::new(reconciler, &config.transcript);

    if let Err(e) = session.start().await {
        println!("! {e}");
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sends = JoinSet::new();

    loop {
        let output = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(cmd) = parse_command(&line) else { continue };
                match session.execute(cmd, chrono::Utc::now()).await {
                    Step::Print(out) => out,
                    Step::Send(text) => {
                        sends.spawn(session.send_task(text));
                        Vec::new()
                    }
                    Step::Quit => break,
                }
            }
            event = events.recv() => match event {
                Ok(event) => session.on_event(&event),
                Err(RecvError::Lagged(skipped)) => session.on_lagged(skipped),
                Err(RecvError::Closed) => break,
            },
            Some(joined) = sends.join_next() => match joined {
                Ok(result) => session.on_send_result(result),
                Err(e) => {
                    tracing::warn!(error = %e, "Send task failed");
                    Vec::new()
                }
            },
        };
        for line in output {
            println!("{line}");
        }
    }

    if !sends.is_empty() {
        tracing::info!(pending = sends.len(), "Abandoning in-flight sends");
    }
    // Aborted sends roll their provisional message back.
    sends.shutdown().await;
    Ok(())
}
