use std::time::Duration;

use anyhow::{bail, Context, Result};
use chartsim_core::{LoopSettings, OrchestratorSettings, RoleConfig, RoleKind};
use clap::{Parser, ValueEnum};

/// One year.
pub const MAX_DURATION_MINUTES: u64 = 60 * 24 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActorSelector {
    All,
    Buyer,
    Farmer,
    Hub,
    Admin,
    #[value(alias = "shg")]
    Group,
}

impl ActorSelector {
    pub fn kinds(&self) -> Vec<RoleKind> {
        match self {
            Self::All => RoleKind::ALL.to_vec(),
            Self::Buyer => vec![RoleKind::Buyer],
            Self::Farmer => vec![RoleKind::Farmer],
            Self::Hub => vec![RoleKind::Hub],
            Self::Admin => vec![RoleKind::Admin],
            Self::Group => vec![RoleKind::Group],
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "chartsim", about = "Feeds live-looking analytics to the dashboard collector")]
pub struct Cli {
    /// Collector base URL
    #[arg(long, env = "COLLECTOR_BASE_URL", default_value = "http://localhost:3000/api/v1")]
    pub url: String,

    /// Run length in minutes
    #[arg(
        long,
        env = "SIM_DURATION_MINUTES",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=MAX_DURATION_MINUTES)
    )]
    pub duration: u64,

    /// Which actor to simulate
    #[arg(long = "type", value_enum, env = "SIM_ACTOR", default_value = "all")]
    pub actor: ActorSelector,

    /// Override the actor id. Only valid with a single actor type.
    #[arg(long, env = "SIM_ACTOR_ID")]
    pub actor_id: Option<String>,

    #[arg(long, default_value_t = 1.0)]
    pub stagger_secs: f64,

    #[arg(long, default_value_t = 5.0)]
    pub shutdown_timeout_secs: f64,

    #[arg(long, default_value_t = 5.0)]
    pub request_timeout_secs: f64,

    /// Bearer token is `<prefix><actor id>`. Empty disables the header.
    #[arg(long, env = "COLLECTOR_TOKEN_PREFIX", default_value = "fake_token_")]
    pub token_prefix: String,

    /// Simulate without contacting the collector
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON
    #[arg(long, env = "CHARTSIM_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        if self.actor == ActorSelector::All && self.actor_id.is_some() {
            bail!("--actor-id needs a single --type, not 'all'");
        }
        if !(1..=MAX_DURATION_MINUTES).contains(&self.duration) {
            bail!("--duration must be between 1 and {MAX_DURATION_MINUTES} minutes");
        }
        Ok(())
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.duration.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        secs("--request-timeout-secs", self.request_timeout_secs)
    }

    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings> {
        Ok(OrchestratorSettings {
            stagger: secs("--stagger-secs", self.stagger_secs)?,
            shutdown_timeout: secs("--shutdown-timeout-secs", self.shutdown_timeout_secs)?,
            loop_settings: LoopSettings::default(),
        })
    }

    pub fn roles(&self) -> Vec<RoleConfig> {
        self.actor
            .kinds()
            .into_iter()
            .map(|kind| match &self.actor_id {
                Some(id) => kind.config().with_actor_id(id),
                None => kind.config(),
            })
            .collect()
    }

    pub fn log_settings(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  COLLECTOR_BASE_URL: {}", self.url);
        tracing::info!("  SIM_DURATION_MINUTES: {}", self.duration);
        tracing::info!("  SIM_ACTOR: {:?}", self.actor);
        tracing::info!("  SIM_ACTOR_ID: {}", self.actor_id.as_deref().unwrap_or("(default)"));
        tracing::info!(
            "  COLLECTOR_TOKEN_PREFIX: {}",
            if self.token_prefix.is_empty() { "(disabled)" } else { "(set)" }
        );
        if self.dry_run {
            tracing::info!("  DRY RUN: snapshots are not sent");
        }
    }
}

fn secs(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("{flag} must be a non-negative number, got {value}"))
}
