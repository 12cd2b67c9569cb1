//! CLI entrypoint for roundtable
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use roundtable_application::{
    EngineState, RoundEngine, SubmitOutcome,
    ports::{ResumptionStore, RoundProgress, ThreadStore},
};
use roundtable_domain::{FinishReason, display_round};
use roundtable_infrastructure::{
    ConfigLoader, FileConfig, FileResumptionStore, InMemoryResumptionStore, InMemoryThreadStore,
    ScriptedGateway, config::FileParticipantConfig,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roundtable", about = "Multi-participant AI round orchestration")]
struct Cli {
    /// The prompt to submit as this round's user message
    question: Option<String>,

    /// Path to a config file (overrides discovery)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip config files and use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Participant models, in turn order (overrides the config roster)
    #[arg(short, long)]
    model: Vec<String>,

    /// Enable the pre-search step for this thread
    #[arg(long)]
    web_search: bool,

    /// Regenerate the latest round instead of submitting a new prompt
    #[arg(long)]
    regenerate: bool,

    /// Suppress streamed output
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("loading configuration")?
    };

    if !cli.model.is_empty() {
        config.participants = cli
            .model
            .iter()
            .map(|m| FileParticipantConfig {
                model: m.clone(),
                role: None,
                enabled: true,
            })
            .collect();
    }
    if cli.web_search {
        config.thread.enable_web_search = true;
    }
    config.validate().context("invalid configuration")?;

    let question = match cli.question {
        Some(q) => q,
        None => bail!("A question is required."),
    };

    info!(participants = config.participants.len(), "starting roundtable");

    match config.resumption.path.clone() {
        Some(path) => {
            let resumption = Arc::new(FileResumptionStore::new(path));
            run(&config, &question, cli.quiet, cli.regenerate, resumption).await
        }
        None => {
            let resumption = Arc::new(InMemoryResumptionStore::new());
            run(&config, &question, cli.quiet, cli.regenerate, resumption).await
        }
    }
}

async fn run<R: ResumptionStore + 'static>(
    config: &FileConfig,
    question: &str,
    quiet: bool,
    regenerate: bool,
    resumption: Arc<R>,
) -> Result<()> {
    let thread = config.thread("local");
    let thread_id = thread.id.clone();
    let roster = config.roster();

    // === Dependency Injection ===
    let gateway = Arc::new(
        ScriptedGateway::new().with_chunk_delay(std::time::Duration::from_millis(15)),
    );
    let store = Arc::new(InMemoryThreadStore::new());
    store.create_thread(&thread).await?;
    store.replace_participants(&thread_id, &roster).await?;

    let state = EngineState::new(thread, roster);
    // the store doubles as the changelog query surface
    let engine = RoundEngine::new(gateway, store.clone(), resumption, store.clone(), state)
        .with_policy(config.policy.clone());

    let progress = ConsoleProgress { quiet };

    let outcome = if regenerate {
        engine.submit(question, &progress).await?;
        engine.regenerate(&progress).await?
    } else {
        engine.submit(question, &progress).await?
    };

    match outcome {
        SubmitOutcome::Completed { round } => {
            if !quiet {
                let messages = store.messages(&thread_id).await?;
                if let Some(moderator) = messages.iter().find(|m| m.is_moderator) {
                    println!("{}", moderator.content);
                }
            }
            println!("\nRound {} complete.", display_round(round));
        }
        SubmitOutcome::Stopped { round } => {
            println!("\nRound {} stopped.", display_round(round));
        }
        SubmitOutcome::Duplicate => {
            println!("\nSubmission already in progress; nothing ran.");
        }
    }
    Ok(())
}

/// Streams round progress to stdout
struct ConsoleProgress {
    quiet: bool,
}

impl RoundProgress for ConsoleProgress {
    fn on_round_start(&self, round: u32, total_participants: usize) {
        if !self.quiet {
            println!(
                "=== Round {} ({} participants) ===",
                display_round(round),
                total_participants
            );
        }
    }

    fn on_presearch_start(&self, _round: u32) {
        if !self.quiet {
            println!("[searching the web...]");
        }
    }

    fn on_presearch_done(&self, _round: u32, forced: bool) {
        if !self.quiet && forced {
            println!("[search timed out, continuing without results]");
        }
    }

    fn on_turn_start(&self, _round: u32, _participant_index: u32, model_id: &str) {
        if !self.quiet {
            println!("\n--- {model_id} ---");
        }
    }

    fn on_turn_chunk(&self, _participant_index: u32, chunk: &str) {
        if !self.quiet {
            print!("{chunk}");
            let _ = std::io::stdout().flush();
        }
    }

    fn on_turn_complete(&self, _round: u32, _participant_index: u32, finish_reason: FinishReason) {
        if !self.quiet {
            println!();
            if finish_reason == FinishReason::Error {
                println!("[turn ended with an error]");
            }
        }
    }

    fn on_moderation_start(&self, _round: u32) {
        if !self.quiet {
            println!("\n--- moderator ---");
        }
    }

    fn on_round_complete(&self, _round: u32) {}
}
