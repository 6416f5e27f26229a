use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::{watch, Mutex};
use tracing::{error, info};

use warden::adapter::{FileStore, JsonlReplayStream};
use warden::application::approval::ApprovalWorkflow;
use warden::application::risk::{RiskManager, RiskState};
use warden::application::runner::AgentRunner;
use warden::application::session::SessionManager;
use warden::domain::WorkflowStage;
use warden::config::Config;
use warden::port::NullNotifier;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "warden", about = "Execution governance for trading agents", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "warden.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded agent transcript (JSONL) through the governed run loop.
    Replay {
        /// Transcript file, one agent event per line.
        transcript: PathBuf,

        /// Workflow stage the run executes under.
        #[arg(long, default_value = "discovery")]
        stage: String,

        /// Objective recorded at the start of the reasoning trace.
        #[arg(long, default_value = "replay transcript")]
        prompt: String,
    },
}

fn parse_stage(s: &str) -> Option<WorkflowStage> {
    let stage = match s.to_ascii_lowercase().as_str() {
        "discovery" => WorkflowStage::Discovery,
        "strategy_build" | "strategy-build" => WorkflowStage::StrategyBuild,
        "backtest" => WorkflowStage::Backtest,
        "analysis" => WorkflowStage::Analysis,
        "execution" => WorkflowStage::Execution,
        "review" => WorkflowStage::Review,
        _ => return None,
    };
    Some(stage)
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Missing config file means defaults; a present but malformed one is fatal.
    let config = if cli.config.exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    config.logging.init();
    info!("warden starting");

    let Command::Replay {
        transcript,
        stage,
        prompt,
    } = cli.command;

    let Some(stage) = parse_stage(&stage) else {
        eprintln!("Unknown stage: {stage}");
        std::process::exit(1);
    };

    if let Err(e) = replay(config, transcript, stage, prompt).await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }

    info!("warden stopped");
}

async fn replay(
    config: Config,
    transcript: PathBuf,
    stage: WorkflowStage,
    prompt: String,
) -> warden::error::Result<()> {
    let store = match &config.data_dir {
        Some(dir) => FileStore::open(dir)?,
        None => FileStore::open_default()?,
    };
    let store = Arc::new(store);

    let workflow = Arc::new(ApprovalWorkflow::new(Arc::new(NullNotifier)));
    let _sweeper = workflow.spawn_sweeper(SWEEP_INTERVAL);

    let state = Arc::new(RiskState::new(config.risk.clone().into()));
    let high_risk = config.risk.high_risk_tools.clone();
    let risk = Arc::new(RiskManager::new(state, high_risk, workflow));

    let session = SessionManager::start(store.clone()).await?;
    let session = Arc::new(Mutex::new(session));

    let runner = AgentRunner::new(config.runner.into(), risk).with_session(session.clone());

    let mut stream = JsonlReplayStream::open(&transcript).await?;

    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            let _ = abort_tx.send(true);
        }
    });

    let result = runner.run(&prompt, stage, &mut stream, abort_rx).await;

    info!(
        session_id = %session.lock().await.session_id(),
        iterations = result.iterations,
        success = result.success,
        degraded = result.degraded,
        aborted = result.aborted,
        "Replay finished"
    );
    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
    Ok(())
}
