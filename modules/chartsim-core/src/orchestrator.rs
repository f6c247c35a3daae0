//! Runs one simulation loop per engine on its own task, staggers their
//! launch and coordinates a best-effort shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::RoleConfig;
use crate::engine::Engine;
use crate::error::{ConfigError, SimError};
use crate::publish::Publisher;
use crate::sim_loop::{self, panic_message, LoopReport, LoopSettings};

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Delay between consecutive loop launches.
    pub stagger: Duration,
    /// How long `stop_all` waits on each loop before abandoning it.
    pub shutdown_timeout: Duration,
    pub loop_settings: LoopSettings,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            stagger: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
            loop_settings: LoopSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    Finished(LoopReport),
    /// The loop refused to start.
    Failed(SimError),
    /// The task panicked outside the per-tick boundary.
    Panicked(String),
    /// Still running when the shutdown timeout expired. Left detached.
    Abandoned,
    /// Shutdown arrived before its staggered launch.
    NotStarted,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    pub outcomes: Vec<(String, LoopOutcome)>,
}

impl ShutdownReport {
    pub fn outcome(&self, actor_id: &str) -> Option<&LoopOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == actor_id)
            .map(|(_, outcome)| outcome)
    }

    pub fn all_finished(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, LoopOutcome::Finished(_)))
    }
}

type LoopHandle = JoinHandle<Result<LoopReport, SimError>>;

pub struct Orchestrator {
    run_id: Uuid,
    pending: Vec<Engine>,
    running: Vec<(String, LoopHandle)>,
    outcomes: Vec<(String, LoopOutcome)>,
    started: bool,
    publisher: Arc<dyn Publisher>,
    token: CancellationToken,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        engines: Vec<Engine>,
        publisher: Arc<dyn Publisher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pending: engines,
            running: Vec::new(),
            outcomes: Vec::new(),
            started: false,
            publisher,
            token: CancellationToken::new(),
            settings,
        }
    }

    /// Build every engine up front. Any invalid role aborts before a loop starts.
    pub fn from_roles(
        roles: Vec<RoleConfig>,
        publisher: Arc<dyn Publisher>,
        settings: OrchestratorSettings,
    ) -> Result<Self, ConfigError> {
        let engines = roles
            .into_iter()
            .map(Engine::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(engines, publisher, settings))
    }

    /// Share an externally owned shutdown token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Cancelling this token stops every loop and any launch still pending.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn actor_ids(&self) -> Vec<String> {
        self.running
            .iter()
            .map(|(id, _)| id.clone())
            .chain(self.pending.iter().map(|e| e.actor_id().to_string()))
            .collect()
    }

    pub async fn start_all(&mut self, duration: Duration) -> Result<(), SimError> {
        if self.started {
            return Err(SimError::AlreadyStarted);
        }
        self.started = true;
        info!(
            run_id = %self.run_id,
            engines = self.pending.len(),
            duration_secs = duration.as_secs(),
            "Starting orchestrator"
        );

        let engines = std::mem::take(&mut self.pending);
        let mut engines = engines.into_iter();
        let mut first = true;
        while let Some(engine) = engines.next() {
            if !first {
                tokio::select! {
                    _ = self.token.cancelled() => {
                        self.pending.push(engine);
                        self.pending.extend(engines);
                        info!(skipped = self.pending.len(), "Launch interrupted by shutdown");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(self.settings.stagger) => {}
                }
            }
            first = false;

            let actor_id = engine.actor_id().to_string();
            let span = info_span!("actor", run_id = %self.run_id, actor = actor_id.as_str());
            let handle = tokio::spawn(
                sim_loop::run(
                    engine,
                    duration,
                    self.publisher.clone(),
                    self.token.child_token(),
                    self.settings.loop_settings,
                )
                .instrument(span),
            );
            self.running.push((actor_id, handle));
        }
        Ok(())
    }

    /// Wait for every loop to reach its deadline, or for the token to be
    /// cancelled, then shut down.
    pub async fn wait(&mut self) -> ShutdownReport {
        while let Some((_, handle)) = self.running.first_mut() {
            let joined = tokio::select! {
                joined = handle => Some(joined),
                _ = self.token.cancelled() => None,
            };
            let Some(joined) = joined else {
                break;
            };
            let (actor_id, _) = self.running.remove(0);
            self.outcomes.push((actor_id, outcome_of(joined)));
        }
        self.stop_all().await
    }

    /// Cancel every loop and wait up to the shutdown timeout for each.
    /// Calling it again returns the same report.
    pub async fn stop_all(&mut self) -> ShutdownReport {
        self.token.cancel();

        for (actor_id, mut handle) in std::mem::take(&mut self.running) {
            let outcome = match tokio::time::timeout(self.settings.shutdown_timeout, &mut handle).await {
                Ok(joined) => outcome_of(joined),
                Err(_) => {
                    warn!(
                        actor = actor_id.as_str(),
                        timeout_secs = self.settings.shutdown_timeout.as_secs_f64(),
                        "Loop did not stop in time, abandoning"
                    );
                    LoopOutcome::Abandoned
                }
            };
            self.outcomes.push((actor_id, outcome));
        }
        for engine in std::mem::take(&mut self.pending) {
            self.outcomes
                .push((engine.actor_id().to_string(), LoopOutcome::NotStarted));
        }

        ShutdownReport {
            outcomes: self.outcomes.clone(),
        }
    }
}

fn outcome_of(joined: Result<Result<LoopReport, SimError>, JoinError>) -> LoopOutcome {
    match joined {
        Ok(Ok(report)) => LoopOutcome::Finished(report),
        Ok(Err(e)) => LoopOutcome::Failed(e),
        Err(e) if e.is_panic() => LoopOutcome::Panicked(panic_message(e.into_panic())),
        Err(_) => LoopOutcome::Abandoned,
    }
}
