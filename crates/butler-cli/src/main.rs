use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::time::{Duration, Instant, sleep};
use tracing::{info, warn};

use butler_core::app::{AppBuilder, log_route_outcome};
use butler_core::config::ConfigLoader;
use butler_core::domain::{DistributionEvent, ExecutionStatus, QrsTaskType, TaskId, TaskMetadata};
use butler_core::impls::{InMemoryMetadataGateway, LoggingOutcomeHandler};
use butler_core::observability::init_tracing;

/// Replay distribute-task completion events against a scripted QRS.
#[derive(Debug, Parser)]
#[command(name = "butler-cli", version)]
struct Cli {
    /// YAML config file (defaults to ./butler.yaml when present)
    #[arg(short, long, env = "BUTLER_CONFIG")]
    config: Option<PathBuf>,

    /// Give up waiting for the queue to drain after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// Scenario file (tasks + events)
    scenario: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    tasks: Vec<ScriptedTask>,
    events: Vec<DistributionEvent>,
}

/// A QRS task whose status advances one step per metadata fetch.
#[derive(Debug, Deserialize)]
struct ScriptedTask {
    task_id: TaskId,
    task_type: QrsTaskType,
    #[serde(default)]
    tags: Vec<String>,
    statuses: Vec<ExecutionStatus>,
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse scenario {}", path.display()))
}

fn scripted_gateway(tasks: Vec<ScriptedTask>) -> InMemoryMetadataGateway {
    tasks.into_iter().fold(InMemoryMetadataGateway::new(), |gateway, task| {
        let initial = task
            .statuses
            .first()
            .copied()
            .unwrap_or(ExecutionStatus::NeverStarted);
        let metadata = task
            .tags
            .into_iter()
            .fold(TaskMetadata::new(task.task_type, initial), |m, tag| m.with_tag(tag));
        gateway.with_task(task.task_id, metadata, task.statuses)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialize logging")?;

    let scenario = load_scenario(&cli.scenario)?;
    info!(
        tasks = scenario.tasks.len(),
        events = scenario.events.len(),
        poll_interval_ms = config.distribute_queue.poll_interval_ms,
        max_age_ms = config.distribute_queue.max_age_ms,
        "scenario loaded"
    );

    let app = AppBuilder::new(Arc::new(scripted_gateway(scenario.tasks)))
        .with_queue_config(config.distribute_queue.queue_config())
        .with_distribute_handler(Arc::new(LoggingOutcomeHandler))?
        .build()?;

    for event in &scenario.events {
        let outcome = app.router.route_distribution_event(event).await;
        log_route_outcome(event, outcome);
    }

    // 1) キューが空になるまで待つ（タイムアウトあり）
    let deadline = Instant::now() + Duration::from_secs(cli.timeout_secs);
    let mut stats = app.queue.get_queue_stats().await;
    while stats.size > 0 {
        if Instant::now() >= deadline {
            warn!(remaining = stats.size, "timed out waiting for the distribute queue to drain");
            break;
        }
        sleep(Duration::from_millis(200)).await;
        stats = app.queue.get_queue_stats().await;
    }

    // 2) 最終状態を stdout に出す
    println!("{}", serde_json::to_string_pretty(&stats)?);

    app.shutdown().await;
    Ok(())
}
