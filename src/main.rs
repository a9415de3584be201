// Aeon - Autonomous longevity research companion
// Main entry point

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aeon::config::{load_settings, resolve_data_dir};
use aeon::controller::AutonomousController;
use aeon::dispatch::{DispatchOutcome, DispatchRequest, ResearchDispatcher};
use aeon::persistence::SnapshotStore;
use aeon::progression::{StageDefinition, StageOracle, StageRequest};

#[derive(Parser)]
#[command(name = "aeon", about = "Autonomous longevity research companion")]
struct Cli {
    /// Data directory (default: ~/.aeon)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the autonomous scheduler until interrupted
    Run,
    /// Print quota and progression status
    Status,
    /// Toggle autonomous mode
    Autonomy {
        #[command(subcommand)]
        state: AutonomyState,
    },
}

#[derive(Subcommand)]
enum AutonomyState {
    On,
    Off,
}

/// Placeholder dispatcher until a research backend is wired in.
/// Every dispatch fails, which the controller accounts as a non-billable
/// attempt.
struct OfflineDispatcher;

#[async_trait]
impl ResearchDispatcher for OfflineDispatcher {
    async fn dispatch(&self, _request: &DispatchRequest) -> Result<DispatchOutcome> {
        anyhow::bail!("no research backend configured")
    }
}

/// Placeholder oracle until a generation backend is wired in.
struct OfflineOracle;

#[async_trait]
impl StageOracle for OfflineOracle {
    async fn request_next_stage(&self, _request: &StageRequest) -> Result<StageDefinition> {
        anyhow::bail!("no stage generation backend configured")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aeon=info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;

    match cli.command {
        Command::Run => run(&data_dir).await,
        Command::Status => status(&data_dir),
        Command::Autonomy { state } => set_autonomy(&data_dir, matches!(state, AutonomyState::On)),
    }
}

async fn run(data_dir: &std::path::Path) -> Result<()> {
    let settings = load_settings(data_dir)?;
    let store = SnapshotStore::new(data_dir);
    let snapshot = store.load_or_create(settings.autonomy.daily_budget, Utc::now())?;

    info!(
        data_dir = %data_dir.display(),
        budget = settings.autonomy.daily_budget,
        "Starting aeon"
    );

    let controller = AutonomousController::new(
        settings.autonomy,
        snapshot,
        Arc::new(OfflineDispatcher),
        Arc::new(OfflineOracle),
        store,
    )?;

    controller.run().await
}

fn status(data_dir: &std::path::Path) -> Result<()> {
    let settings = load_settings(data_dir)?;
    let store = SnapshotStore::new(data_dir);
    let snapshot = store.load_or_create(settings.autonomy.daily_budget, Utc::now())?;

    let quota = &snapshot.quota;
    let state = &snapshot.progression;

    println!("Autonomous mode: {}", on_off(snapshot.autonomous_mode_enabled));
    println!(
        "Quota:           {}/{} calls this cycle (anchor {})",
        quota.calls_made,
        quota.budget_limit,
        quota.cycle_anchor.format("%Y-%m-%d %H:%M UTC")
    );
    println!("Stage:           {}", state.current_stage);
    println!(
        "Vectors:         genetic {:.0} | memic {:.0} | cognitive {:.0}",
        state.vectors.genetic, state.vectors.memic, state.vectors.cognitive
    );
    println!("Longevity score: {:.0}", state.longevity_score);
    println!(
        "Milestones:      {}/{} unlocked ({} pts)",
        state.unlocked_count(),
        state.milestones.len(),
        state.reward_points()
    );

    if !snapshot.recent_notifications.is_empty() {
        println!("\nRecent activity:");
        for line in snapshot.recent_notifications.iter().rev().take(10) {
            println!("  {}", line);
        }
    }

    Ok(())
}

fn set_autonomy(data_dir: &std::path::Path, enabled: bool) -> Result<()> {
    let settings = load_settings(data_dir)?;
    let store = SnapshotStore::new(data_dir);
    let mut snapshot = store.load_or_create(settings.autonomy.daily_budget, Utc::now())?;

    snapshot.autonomous_mode_enabled = enabled;
    store.save(&snapshot)?;
    println!("Autonomous mode: {}", on_off(enabled));
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
