mod config;
mod publisher;

use std::sync::Arc;

use anyhow::Result;
use chartsim_core::{
    sim_loop, Engine, LoopOutcome, LoopSettings, NoopPublisher, Orchestrator, Publisher,
    ShutdownReport,
};
use clap::Parser;
use collector_client::CollectorClient;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Cli;
use publisher::CollectorPublisher;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chartsim=info,chartsim_core=info"));
    if cli.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting chartsim");
    cli.validate()?;
    cli.log_settings();

    let publisher: Arc<dyn Publisher> = if cli.dry_run {
        Arc::new(NoopPublisher)
    } else {
        let client = CollectorClient::new(&cli.url, cli.request_timeout()?)?;
        Arc::new(CollectorPublisher::new(client, cli.token_prefix.clone()))
    };

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Stopping all simulators...");
        signal_token.cancel();
    });

    let mut roles = cli.roles();
    let report = if roles.len() == 1 {
        let engine = Engine::new(roles.remove(0))?;
        let actor_id = engine.actor_id().to_string();
        let outcome = match sim_loop::run(
            engine,
            cli.run_duration(),
            publisher,
            token,
            LoopSettings::default(),
        )
        .await
        {
            Ok(report) => LoopOutcome::Finished(report),
            Err(e) => LoopOutcome::Failed(e),
        };
        ShutdownReport {
            outcomes: vec![(actor_id, outcome)],
        }
    } else {
        let mut orchestrator = Orchestrator::from_roles(roles, publisher, cli.orchestrator_settings()?)?
            .with_token(token);
        info!(run_id = %orchestrator.run_id(), actors = ?orchestrator.actor_ids(), "Engines ready");
        orchestrator.start_all(cli.run_duration()).await?;
        orchestrator.wait().await
    };

    log_report(&report);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

fn log_report(report: &ShutdownReport) {
    for (actor_id, outcome) in &report.outcomes {
        match outcome {
            LoopOutcome::Finished(r) => info!(
                actor = actor_id.as_str(),
                ticks = r.ticks,
                events = r.events,
                skipped = r.skipped,
                publishes = r.publishes,
                publish_failures = r.publish_failures,
                tick_failures = r.tick_failures,
                reason = ?r.stop_reason,
                "Simulator finished"
            ),
            LoopOutcome::Failed(e) => warn!(actor = actor_id.as_str(), error = %e, "Simulator failed to start"),
            LoopOutcome::Panicked(message) => {
                warn!(actor = actor_id.as_str(), panic = message.as_str(), "Simulator panicked")
            }
            LoopOutcome::Abandoned => warn!(actor = actor_id.as_str(), "Simulator abandoned at shutdown"),
            LoopOutcome::NotStarted => info!(actor = actor_id.as_str(), "Simulator never launched"),
        }
    }
    info!("All simulators stopped");
}
