mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::domain::{ContainerId, Position, YardDimensions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use yard_core::{CsvUpload, HttpYardService, YardError, YardState, YardStateCoordinator};

use crate::config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(about = "Watches a container yard and issues yard intents")]
struct Cli {
    #[arg(long, default_value = "yard.toml")]
    config: PathBuf,
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    /// Yard bounds as XxYxZ.
    #[arg(long)]
    dimensions: Option<YardDimensions>,
    #[arg(long)]
    log_stream: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Polls the yard and logs every published snapshot until interrupted.
    Watch {
        #[arg(long)]
        json: bool,
    },
    Remove {
        id: String,
    },
    Place {
        id: String,
        x: i64,
        y: i64,
        z: i64,
    },
    Import {
        path: PathBuf,
    },
    Reoptimize,
    Health,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.service_url {
            settings.service_url = v.clone();
        }
        if let Some(v) = &self.api_key {
            settings.api_key = Some(v.clone());
        }
        if let Some(v) = self.dimensions {
            settings.yard_dimensions = v;
        }
        if let Some(v) = &self.log_stream {
            settings.log_stream = v.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    cli.apply(&mut settings);
    let config = settings.coordinator_config();
    let service = HttpYardService::new(&config)?;
    info!(service_url = %service.base_url(), dimensions = %config.dimensions, "yard monitor configured");
    let coordinator = YardStateCoordinator::new(config, Arc::new(service));

    let health = coordinator
        .check_health()
        .await
        .context("yard service health check failed")?;
    if !health.is_healthy() {
        bail!("yard service reports status '{}'", health.status);
    }
    if let Command::Health = cli.command {
        println!("status={}", health.status);
        return Ok(());
    }

    coordinator.start().await;
    coordinator.refresh().await;
    let outcome = run(&coordinator, cli.command).await;
    coordinator.stop().await;
    outcome
}

async fn run(coordinator: &YardStateCoordinator, command: Command) -> Result<()> {
    match command {
        Command::Watch { json } => watch(coordinator, json).await?,
        Command::Remove { id } => {
            intent(coordinator.remove_container(&ContainerId::new(id)).await)?;
            report(&coordinator.snapshot());
        }
        Command::Place { id, x, y, z } => {
            intent(
                coordinator
                    .manual_place(&ContainerId::new(id), Position::new(x, y, z))
                    .await,
            )?;
            report(&coordinator.snapshot());
        }
        Command::Import { path } => {
            let upload = CsvUpload::from_path(&path).await?;
            intent(coordinator.import_csv(upload).await)?;
            report(&coordinator.snapshot());
        }
        Command::Reoptimize => {
            intent(coordinator.request_reoptimize().await)?;
            report(&coordinator.snapshot());
        }
        Command::Health => {}
    }
    Ok(())
}

fn intent(result: Result<(), YardError>) -> Result<()> {
    result.map_err(|err| {
        let kind = err.kind();
        if kind.is_local() {
            warn!(%kind, "intent rejected without contacting the yard service");
        }
        anyhow::Error::new(err).context(format!("intent failed: {kind}"))
    })
}

async fn watch(coordinator: &YardStateCoordinator, json: bool) -> Result<()> {
    let mut subscription = coordinator.subscribe();
    report(&subscription.latest());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; stopping");
                return Ok(());
            }
            state = subscription.changed() => {
                let Some(state) = state else {
                    return Ok(());
                };
                if json {
                    println!("{}", serde_json::to_string(&summary(&state))?);
                } else {
                    report(&state);
                }
            }
        }
    }
}

fn report(state: &YardState) {
    info!(
        version = state.version,
        containers = state.grid.len(),
        capacity = state.grid.dimensions().capacity(),
        total_moves = state.metrics.total_moves,
        money_saved = state.metrics.money_saved,
        log_lines = state.logs.len(),
        episodes = state.training_progress.map(|t| t.episodes),
        "yard snapshot"
    );
    for (channel, status) in &state.channels {
        if let Some(kind) = status.last_error {
            warn!(
                %channel,
                %kind,
                failures = status.consecutive_failures,
                "channel reporting stale data"
            );
        }
    }
}

fn summary(state: &YardState) -> serde_json::Value {
    serde_json::json!({
        "version": state.version,
        "containers": state.containers(),
        "metrics": state.metrics,
        "logs": state.logs,
        "training_progress": state.training_progress,
        "channels": state.channels,
    })
}
