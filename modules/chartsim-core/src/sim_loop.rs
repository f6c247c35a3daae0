//! Drives one engine: tick, sleep, re-check the deadline and the stop token.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{Engine, TickOutcome};
use crate::error::SimError;
use crate::publish::Publisher;

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Pause after a tick failure, in place of the role's sleep band.
    pub failure_backoff: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            failure_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DeadlineElapsed,
    Cancelled,
}

/// Counts for one finished loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    pub actor_id: String,
    pub ticks: u64,
    pub events: u64,
    pub skipped: u64,
    pub publishes: u64,
    pub publish_failures: u64,
    pub tick_failures: u64,
    pub stop_reason: StopReason,
}

impl LoopReport {
    fn new(actor_id: &str) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            ticks: 0,
            events: 0,
            skipped: 0,
            publishes: 0,
            publish_failures: 0,
            tick_failures: 0,
            stop_reason: StopReason::Cancelled,
        }
    }
}

/// Run `engine` until `duration` elapses or `token` is cancelled.
///
/// Tick errors and panics, including a panicking publish, are logged and
/// absorbed; only a failure to start is returned.
pub async fn run(
    mut engine: Engine,
    duration: Duration,
    publisher: Arc<dyn Publisher>,
    token: CancellationToken,
    settings: LoopSettings,
) -> Result<LoopReport, SimError> {
    let deadline = engine.start(duration)?;
    let mut rng = StdRng::from_os_rng();
    let mut report = LoopReport::new(engine.actor_id());

    info!(
        actor = engine.actor_id(),
        role = engine.role(),
        destination = %engine.destination(),
        duration_secs = duration.as_secs(),
        "Starting simulation loop"
    );

    loop {
        if token.is_cancelled() {
            report.stop_reason = StopReason::Cancelled;
            break;
        }
        if engine.deadline_elapsed(Instant::now()) {
            report.stop_reason = StopReason::DeadlineElapsed;
            break;
        }

        report.ticks += 1;
        let now = Local::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| engine.tick(&mut rng, now)))
            .unwrap_or_else(|payload| Err(SimError::ActionPanicked(panic_message(payload))));

        let failure = match result {
            Ok(TickOutcome::Event(event)) => {
                report.events += 1;
                info!(
                    actor = engine.actor_id(),
                    event = event.name.as_str(),
                    amount = event.amount,
                    subject = event.subject.as_deref(),
                    details = %join_details(&event.details),
                    transfers = event.transfers.len(),
                    alert = event.alert.as_deref(),
                    "Event applied"
                );
                None
            }
            Ok(TickOutcome::Skipped { event, reason }) => {
                report.skipped += 1;
                debug!(actor = engine.actor_id(), event = event.as_str(), ?reason, "Event skipped");
                None
            }
            Ok(TickOutcome::Refreshed) => {
                debug!(actor = engine.actor_id(), "Metrics refreshed");
                None
            }
            Ok(TickOutcome::Publish(payload)) => {
                let sent = AssertUnwindSafe(publisher.publish(engine.destination(), &payload))
                    .catch_unwind()
                    .await;
                match sent {
                    Ok(Ok(())) => {
                        report.publishes += 1;
                        info!(
                            actor = engine.actor_id(),
                            destination = %engine.destination(),
                            fields = payload.data.len(),
                            "Snapshot published"
                        );
                        None
                    }
                    Ok(Err(e)) => {
                        report.publish_failures += 1;
                        warn!(
                            actor = engine.actor_id(),
                            destination = %engine.destination(),
                            error = %e,
                            "Failed to publish snapshot"
                        );
                        None
                    }
                    Err(panic) => Some(SimError::ActionPanicked(panic_message(panic))),
                }
            }
            Err(e) => Some(e),
        };

        let failed = failure.is_some();
        if let Some(e) = failure {
            report.tick_failures += 1;
            warn!(actor = engine.actor_id(), error = %e, "Tick failed");
        }

        let pause = if failed {
            settings.failure_backoff
        } else {
            engine.sleep_band().sample(&mut rng)
        };
        let wake = (Instant::now() + pause).min(deadline);
        tokio::select! {
            _ = token.cancelled() => {
                report.stop_reason = StopReason::Cancelled;
                break;
            }
            _ = tokio::time::sleep_until(wake) => {}
        }
    }

    engine.stop();
    info!(
        actor = report.actor_id.as_str(),
        ticks = report.ticks,
        events = report.events,
        publishes = report.publishes,
        reason = ?report.stop_reason,
        "Simulation loop stopped"
    );
    Ok(report)
}

fn join_details(details: &[(String, String)]) -> String {
    details
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
