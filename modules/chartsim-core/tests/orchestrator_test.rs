//! Integration tests for the orchestrator: staggered launch, deadline runs,
//! signal-style shutdown and failure isolation between loops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chartsim_core::{
    ActionSpec, ConfigError, Destination, LoopOutcome, MemoryPublisher, Orchestrator,
    OrchestratorSettings, PublishError, Publisher, RoleConfig, Scope, SleepBand, SnapshotPayload,
    StopReason,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn publishing_role(actor_id: &str, sleep: SleepBand) -> RoleConfig {
    RoleConfig::new("test", actor_id, Scope::Users, sleep).on(1.0, ActionSpec::Publish)
}

fn settings(stagger_ms: u64, timeout_ms: u64) -> OrchestratorSettings {
    OrchestratorSettings {
        stagger: Duration::from_millis(stagger_ms),
        shutdown_timeout: Duration::from_millis(timeout_ms),
        ..OrchestratorSettings::default()
    }
}

/// Panics for one actor, records everyone else.
struct PanicsFor {
    actor_id: &'static str,
    inner: MemoryPublisher,
}

#[async_trait]
impl Publisher for PanicsFor {
    async fn publish(
        &self,
        destination: &Destination,
        payload: &SnapshotPayload,
    ) -> Result<(), PublishError> {
        if destination.actor_id == self.actor_id {
            panic!("collector exploded");
        }
        self.inner.publish(destination, payload).await
    }
}

struct AlwaysFails;

#[async_trait]
impl Publisher for AlwaysFails {
    async fn publish(&self, _: &Destination, _: &SnapshotPayload) -> Result<(), PublishError> {
        Err(PublishError::transient(Some(503), "service unavailable"))
    }
}

/// An in-flight publish that never completes in time.
struct Hangs;

#[async_trait]
impl Publisher for Hangs {
    async fn publish(&self, _: &Destination, _: &SnapshotPayload) -> Result<(), PublishError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_all_interrupts_long_sleeps() -> Result<()> {
    let roles = ["a_001", "b_001", "c_001"]
        .into_iter()
        .map(|id| publishing_role(id, SleepBand::from_secs(2.0, 4.0)))
        .collect();
    let publisher = Arc::new(MemoryPublisher::new());
    let mut orchestrator = Orchestrator::from_roles(roles, publisher.clone(), settings(10, 5_000))?;

    orchestrator.start_all(Duration::from_secs(600)).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let report = orchestrator.stop_all().await;
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(report.outcomes.len(), 3);
    for (actor_id, outcome) in &report.outcomes {
        let LoopOutcome::Finished(loop_report) = outcome else {
            panic!("{actor_id} did not finish: {outcome:?}");
        };
        assert_eq!(loop_report.stop_reason, StopReason::Cancelled);
        assert_eq!(loop_report.ticks, 1);
        assert_eq!(publisher.count_for(actor_id), 1);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn loops_stop_on_their_own_deadline() -> Result<()> {
    let roles = vec![
        publishing_role("a_001", SleepBand::from_secs(1.0, 1.0)),
        publishing_role("b_001", SleepBand::from_secs(1.0, 1.0)),
    ];
    let publisher = Arc::new(MemoryPublisher::new());
    let mut orchestrator = Orchestrator::from_roles(roles, publisher.clone(), settings(1_000, 5_000))?;

    orchestrator.start_all(Duration::from_secs(10)).await?;
    let report = orchestrator.wait().await;

    assert!(report.all_finished());
    for (actor_id, outcome) in &report.outcomes {
        let LoopOutcome::Finished(loop_report) = outcome else {
            unreachable!();
        };
        assert_eq!(loop_report.stop_reason, StopReason::DeadlineElapsed);
        assert_eq!(loop_report.ticks, 10);
        assert_eq!(publisher.count_for(actor_id), 10);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_panicking_publisher_keeps_every_loop_running() -> Result<()> {
    let roles = vec![
        publishing_role("bad_001", SleepBand::from_secs(1.0, 1.0)),
        publishing_role("good_001", SleepBand::from_secs(1.0, 1.0)),
    ];
    let publisher = Arc::new(PanicsFor {
        actor_id: "bad_001",
        inner: MemoryPublisher::new(),
    });
    let mut orchestrator = Orchestrator::from_roles(roles, publisher.clone(), settings(1_000, 5_000))?;

    orchestrator.start_all(Duration::from_secs(5)).await?;
    let report = orchestrator.wait().await;

    match report.outcome("bad_001") {
        Some(LoopOutcome::Finished(loop_report)) => {
            assert_eq!(loop_report.stop_reason, StopReason::DeadlineElapsed);
            assert_eq!(loop_report.tick_failures, 5);
            assert_eq!(loop_report.publishes, 0);
        }
        other => panic!("expected the loop to absorb publish panics, got {other:?}"),
    }
    match report.outcome("good_001") {
        Some(LoopOutcome::Finished(loop_report)) => {
            assert_eq!(loop_report.stop_reason, StopReason::DeadlineElapsed);
            assert_eq!(loop_report.publishes, 5);
        }
        other => panic!("expected a finished loop, got {other:?}"),
    }
    assert_eq!(publisher.inner.count_for("good_001"), 5);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn publish_failures_are_counted_not_fatal() -> Result<()> {
    let roles = vec![publishing_role("a_001", SleepBand::from_secs(1.0, 1.0))];
    let mut orchestrator = Orchestrator::from_roles(roles, Arc::new(AlwaysFails), settings(0, 5_000))?;

    orchestrator.start_all(Duration::from_secs(4)).await?;
    let report = orchestrator.wait().await;

    let Some(LoopOutcome::Finished(loop_report)) = report.outcome("a_001") else {
        panic!("loop should survive publish failures");
    };
    assert_eq!(loop_report.ticks, 4);
    assert_eq!(loop_report.publish_failures, 4);
    assert_eq!(loop_report.publishes, 0);
    assert_eq!(loop_report.tick_failures, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stuck_loops_are_abandoned_after_the_timeout() -> Result<()> {
    let roles = vec![publishing_role("a_001", SleepBand::from_secs(1.0, 1.0))];
    let mut orchestrator = Orchestrator::from_roles(roles, Arc::new(Hangs), settings(0, 100))?;

    orchestrator.start_all(Duration::from_secs(60)).await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    let report = orchestrator.stop_all().await;

    assert_eq!(report.outcome("a_001"), Some(&LoopOutcome::Abandoned));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_stagger_skips_pending_launches() -> Result<()> {
    let roles = vec![
        publishing_role("first_001", SleepBand::from_secs(1.0, 1.0)),
        publishing_role("second_001", SleepBand::from_secs(1.0, 1.0)),
        publishing_role("third_001", SleepBand::from_secs(1.0, 1.0)),
    ];
    let mut orchestrator =
        Orchestrator::from_roles(roles, Arc::new(MemoryPublisher::new()), settings(60_000, 5_000))?;

    let token = orchestrator.token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        token.cancel();
    });
    orchestrator.start_all(Duration::from_secs(600)).await?;
    let report = orchestrator.stop_all().await;

    assert!(matches!(report.outcome("first_001"), Some(LoopOutcome::Finished(_))));
    assert_eq!(report.outcome("second_001"), Some(&LoopOutcome::NotStarted));
    assert_eq!(report.outcome("third_001"), Some(&LoopOutcome::NotStarted));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_all_is_idempotent() -> Result<()> {
    let roles = vec![publishing_role("a_001", SleepBand::from_secs(1.0, 1.0))];
    let mut orchestrator =
        Orchestrator::from_roles(roles, Arc::new(MemoryPublisher::new()), settings(0, 5_000))?;

    orchestrator.start_all(Duration::from_secs(60)).await?;
    let first = orchestrator.stop_all().await;
    let second = orchestrator.stop_all().await;

    assert_eq!(first, second);
    assert_eq!(first.outcomes.len(), 1);
    assert!(orchestrator.start_all(Duration::from_secs(60)).await.is_err());
    Ok(())
}

#[test]
fn invalid_role_fails_before_any_loop_starts() {
    let roles = vec![
        publishing_role("a_001", SleepBand::from_secs(1.0, 1.0)),
        RoleConfig::new("broken", "b_001", Scope::Users, SleepBand::from_secs(1.0, 1.0))
            .on(0.7, ActionSpec::Publish),
    ];
    let result = Orchestrator::from_roles(roles, Arc::new(MemoryPublisher::new()), settings(0, 0));
    assert!(matches!(result, Err(ConfigError::UnterminatedTable { .. })));
}
