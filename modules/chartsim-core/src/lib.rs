//! Randomized actor simulation for live-looking dashboard metrics.
//!
//! Each role is plain data (`RoleConfig`). An `Engine` owns one actor's
//! state and evolves it tick by tick; `sim_loop::run` drives an engine
//! against a `Publisher`; the `Orchestrator` runs several loops at once
//! and shuts them down together.

pub mod alerts;
pub mod config;
pub mod dispatcher;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod publish;
pub mod roles;
pub mod sample;
pub mod series;
pub mod sim_loop;
pub mod snapshot;

pub use config::{ActionSpec, RoleConfig, SleepBand};
pub use engine::{Engine, EventReport, Lifecycle, TickOutcome};
pub use error::{ConfigError, SimError};
pub use orchestrator::{LoopOutcome, Orchestrator, OrchestratorSettings, ShutdownReport};
pub use publish::{MemoryPublisher, NoopPublisher, PublishError, Publisher};
pub use roles::RoleKind;
pub use sim_loop::{LoopReport, LoopSettings, StopReason};
pub use snapshot::{Destination, Scope, SnapshotPayload};
