//! Interactive chat with a local model.

use babybot::chat::{ChatController, RejectReason, SubmitOutcome};
use babybot::cli::CommonArgs;
use babybot::llm::LocalProvider;
use babybot::loader::LOAD_ERROR_LABEL;
use babybot::session::SessionContext;
use babybot::status::{StatusReporter, TerminalStatus};
use babybot::terminal::TerminalChat;
use babybot::{ModelLoader, device};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Chat with a small language model running on this machine.
#[derive(Parser)]
#[command(name = "babybot-chat", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

/// Typed on its own line to leave the chat.
const QUIT_COMMAND: &str = "/quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.common.resolve_config()?;
    let _log_guard = babybot::logging::init(&config.logging);

    let provider = Arc::new(LocalProvider::new(&config.model));
    let loader = ModelLoader::new(provider)
        .with_device(device::resolve(config.model.device))
        .with_dtype(config.model.dtype.clone());
    let status = StatusReporter::new(Box::new(TerminalStatus::new()));
    let session = SessionContext::new(status, &config.sampling);
    let mut chat = ChatController::new(session, Box::new(TerminalChat::default()));

    println!("babybot v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = chat.initialize(&loader, &config.model.model_id).await {
        eprintln!("\n{LOAD_ERROR_LABEL}");
        return Err(e.into());
    }
    println!("Ready! Type a message and press Enter ({QUIT_COMMAND} to exit).\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == QUIT_COMMAND {
            break;
        }
        match chat.submit(&line).await {
            SubmitOutcome::Rejected(RejectReason::EmptyInput) => {}
            SubmitOutcome::Rejected(reason) => info!("input ignored: {reason:?}"),
            SubmitOutcome::Completed | SubmitOutcome::Failed => println!(),
        }
    }

    info!("chat ended after {} messages", chat.transcript().len());
    Ok(())
}
