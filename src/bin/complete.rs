//! One-shot text completion with a local model.

use babybot::chat::SubmitOutcome;
use babybot::cli::CommonArgs;
use babybot::completion::CompletionController;
use babybot::llm::LocalProvider;
use babybot::loader::LOAD_ERROR_LABEL;
use babybot::session::SessionContext;
use babybot::status::{StatusReporter, TerminalStatus};
use babybot::terminal::TerminalCompletion;
use babybot::{ModelLoader, device};
use clap::Parser;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Complete a prompt with a small language model running on this machine.
#[derive(Parser)]
#[command(name = "babybot-complete", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Prompt to complete. Read from stdin when omitted.
    #[arg(short, long)]
    prompt: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.common.resolve_config()?;
    let _log_guard = babybot::logging::init(&config.logging);

    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let provider = Arc::new(LocalProvider::new(&config.model));
    let loader = ModelLoader::new(provider)
        .with_device(device::resolve(config.model.device))
        .with_dtype(config.model.dtype.clone());
    let status = StatusReporter::new(Box::new(TerminalStatus::new()));
    let session = SessionContext::new(status, &config.sampling);
    let mut completion = CompletionController::new(session, Box::new(TerminalCompletion));

    if let Err(e) = completion.initialize(&loader, &config.model.model_id).await {
        eprintln!("\n{LOAD_ERROR_LABEL}");
        return Err(e.into());
    }

    match completion.submit(&prompt).await {
        SubmitOutcome::Completed => Ok(()),
        SubmitOutcome::Failed => anyhow::bail!("generation failed"),
        SubmitOutcome::Rejected(reason) => anyhow::bail!("prompt rejected: {reason:?}"),
    }
}
