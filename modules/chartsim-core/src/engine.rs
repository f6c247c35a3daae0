//! Actor simulation engine: one actor's owned state plus the rules that
//! evolve it tick by tick.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::time::Instant;

use crate::alerts::{AlertFeed, AlertVocabulary};
use crate::config::{ActionSpec, RoleConfig, SleepBand};
use crate::dispatcher::WeightedDispatcher;
use crate::distribution::{CategoryDistribution, DistributionRule};
use crate::error::{ConfigError, SimError};
use crate::events::{Effect, EventSpec, Precondition};
use crate::series::{SeriesRule, TimeBucketSeries};
use crate::snapshot::{Destination, SnapshotData, SnapshotPayload, SnapshotValue};

/// Everything one actor owns. Mutated only by its engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    counters: BTreeMap<String, u64>,
    series: BTreeMap<String, TimeBucketSeries>,
    distributions: BTreeMap<String, CategoryDistribution>,
    alerts: Option<(String, AlertFeed)>,
}

impl ActorState {
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn series(&self, name: &str) -> Option<&TimeBucketSeries> {
        self.series.get(name)
    }

    pub fn distribution(&self, name: &str) -> Option<&CategoryDistribution> {
        self.distributions.get(name)
    }

    pub fn alerts(&self) -> Option<&AlertFeed> {
        self.alerts.as_ref().map(|(_, feed)| feed)
    }

    /// Flatten into payload fields. Pure: repeated calls without an
    /// intervening mutation are equal.
    pub fn snapshot(&self) -> SnapshotData {
        let mut data = SnapshotData::default();
        for (key, value) in &self.counters {
            data.insert(key.clone(), SnapshotValue::Count(*value));
        }
        for (key, series) in &self.series {
            data.insert(key.clone(), SnapshotValue::Buckets(series.buckets().to_vec()));
        }
        for (key, dist) in &self.distributions {
            data.insert(key.clone(), SnapshotValue::Buckets(dist.to_buckets()));
        }
        if let Some((key, feed)) = &self.alerts {
            data.insert(key.clone(), SnapshotValue::Alerts(feed.alerts().cloned().collect()));
        }
        data
    }

    fn precondition_holds(&self, precondition: &Precondition) -> bool {
        match precondition {
            Precondition::Positive(counter) => self.counter(counter).unwrap_or(0) > 0,
            Precondition::Exceeds { counter, other } => {
                self.counter(counter).unwrap_or(0) > self.counter(other).unwrap_or(0)
            }
            Precondition::UnresolvedAlert => self.alerts().is_some_and(AlertFeed::has_unresolved),
        }
    }

    fn apply_event<R: Rng + ?Sized>(
        &mut self,
        event: &EventSpec,
        vocabulary: Option<&AlertVocabulary>,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<EventReport, SimError> {
        let amount = event.amount.as_ref().map(|draw| draw.sample(rng));
        let subject = event
            .subject
            .as_ref()
            .and_then(|words| words.choose(rng))
            .cloned();
        let details = event
            .details
            .iter()
            .filter_map(|(key, words)| Some((key.clone(), words.choose(rng)?.clone())))
            .collect();

        // Stage counter arithmetic first so a failing effect leaves the
        // state untouched.
        let mut staged = self.counters.clone();
        for effect in &event.effects {
            if let Effect::Counter { name, delta } = effect {
                let entry = staged
                    .get_mut(name)
                    .ok_or_else(|| SimError::UnknownTarget(name.clone()))?;
                let delta = delta.resolve(amount.unwrap_or(0));
                *entry = entry.checked_add_signed(delta).ok_or_else(|| {
                    if delta < 0 {
                        SimError::CounterUnderflow(name.clone())
                    } else {
                        SimError::CounterOverflow(name.clone())
                    }
                })?;
            }
        }
        self.counters = staged;

        let mut report = EventReport {
            name: event.name.clone(),
            amount,
            subject,
            details,
            transfers: Vec::new(),
            alert: None,
        };
        for effect in &event.effects {
            match effect {
                Effect::Counter { .. } => {}
                Effect::Transfer {
                    distribution,
                    category,
                    delta,
                } => {
                    let Some(category) = category.resolve(report.subject.as_deref(), rng) else {
                        continue;
                    };
                    let dist = self
                        .distributions
                        .get_mut(distribution)
                        .ok_or_else(|| SimError::UnknownTarget(distribution.clone()))?;
                    let value = dist
                        .transfer(category, delta.resolve(amount.unwrap_or(0)))
                        .ok_or_else(|| SimError::UnknownTarget(category.to_string()))?;
                    report.transfers.push(Transfer {
                        distribution: distribution.clone(),
                        category: category.to_string(),
                        value,
                    });
                }
                Effect::RaiseAlert => {
                    if let (Some((_, feed)), Some(vocabulary)) = (self.alerts.as_mut(), vocabulary) {
                        report.alert = feed.raise(vocabulary, rng, now).map(|a| a.title.clone());
                    }
                }
                Effect::ResolveAlert => {
                    if let Some((_, feed)) = self.alerts.as_mut() {
                        report.alert = feed.resolve_random(rng).map(|a| a.title.clone());
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Index into the engine's event list, or an ambient action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Event(usize),
    Refresh,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running { deadline: Instant },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PreconditionUnmet,
    ChanceMissed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub distribution: String,
    pub category: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReport {
    pub name: String,
    pub amount: Option<i64>,
    pub subject: Option<String>,
    /// Log-only context such as the farmer behind an order.
    pub details: Vec<(String, String)>,
    pub transfers: Vec<Transfer>,
    /// Title of the alert raised or resolved.
    pub alert: Option<String>,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Event(EventReport),
    Skipped { event: String, reason: SkipReason },
    Refreshed,
    Publish(SnapshotPayload),
}

pub struct Engine {
    role: String,
    destination: Destination,
    sleep: SleepBand,
    state: ActorState,
    series_rules: Vec<(String, SeriesRule)>,
    distribution_rules: Vec<(String, DistributionRule)>,
    vocabulary: Option<AlertVocabulary>,
    events: Vec<EventSpec>,
    dispatcher: WeightedDispatcher<Action>,
    lifecycle: Lifecycle,
}

impl Engine {
    /// Validate a role configuration and seed the actor's state.
    pub fn new(config: RoleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut series = BTreeMap::new();
        let mut series_rules = Vec::with_capacity(config.series.len());
        for cfg in config.series {
            cfg.rule.validate(&cfg.key)?;
            series.insert(cfg.key.clone(), TimeBucketSeries::new(&cfg.key, cfg.buckets)?);
            series_rules.push((cfg.key, cfg.rule));
        }

        let mut distributions = BTreeMap::new();
        let mut distribution_rules = Vec::with_capacity(config.distributions.len());
        for cfg in config.distributions {
            cfg.rule.validate(&cfg.key)?;
            let dist = CategoryDistribution::new(&cfg.key, &cfg.entries, cfg.band, &cfg.overrides)?;
            distributions.insert(cfg.key.clone(), dist);
            distribution_rules.push((cfg.key, cfg.rule));
        }

        let (alerts, vocabulary) = match config.alerts {
            Some(cfg) => (
                Some((cfg.key, AlertFeed::new(cfg.cap, &cfg.seeds, Utc::now()))),
                Some(cfg.vocabulary),
            ),
            None => (None, None),
        };

        let mut events = Vec::new();
        let mut table = Vec::with_capacity(config.table.len());
        for (bound, action) in config.table {
            let action = match action {
                ActionSpec::Event(event) => {
                    events.push(event);
                    Action::Event(events.len() - 1)
                }
                ActionSpec::Refresh => Action::Refresh,
                ActionSpec::Publish => Action::Publish,
            };
            table.push((bound, action));
        }
        let dispatcher = WeightedDispatcher::new(table)?;

        Ok(Self {
            role: config.role,
            destination: Destination::new(config.scope, config.actor_id),
            sleep: config.sleep,
            state: ActorState {
                counters: config.counters.into_iter().collect(),
                series,
                distributions,
                alerts,
            },
            series_rules,
            distribution_rules,
            vocabulary,
            events,
            dispatcher,
            lifecycle: Lifecycle::Idle,
        })
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn actor_id(&self) -> &str {
        &self.destination.actor_id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn sleep_band(&self) -> SleepBand {
        self.sleep
    }

    pub fn state(&self) -> &ActorState {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.name.as_str())
    }

    /// `Idle -> Running`, recording `deadline = now + duration`.
    pub fn start(&mut self, duration: Duration) -> Result<Instant, SimError> {
        match self.lifecycle {
            Lifecycle::Idle => {
                let deadline = Instant::now()
                    .checked_add(duration)
                    .ok_or(SimError::DurationTooLong(duration))?;
                self.lifecycle = Lifecycle::Running { deadline };
                Ok(deadline)
            }
            _ => Err(SimError::AlreadyStarted),
        }
    }

    pub fn deadline_elapsed(&self, now: Instant) -> bool {
        match self.lifecycle {
            Lifecycle::Running { deadline } => now >= deadline,
            Lifecycle::Idle => false,
            Lifecycle::Stopped => true,
        }
    }

    pub fn stop(&mut self) {
        self.lifecycle = Lifecycle::Stopped;
    }

    /// Dispatch one weighted action and execute it.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Local>,
    ) -> Result<TickOutcome, SimError> {
        if !matches!(self.lifecycle, Lifecycle::Running { .. }) {
            return Err(SimError::NotRunning);
        }
        let action = *self.dispatcher.sample(rng);
        match action {
            Action::Event(index) => self.run_event(index, rng, now),
            Action::Refresh => {
                self.refresh(rng, now);
                Ok(TickOutcome::Refreshed)
            }
            Action::Publish => {
                self.refresh(rng, now);
                Ok(TickOutcome::Publish(self.capture(now.with_timezone(&Utc))))
            }
        }
    }

    /// Run a named event directly, bypassing the dispatcher.
    pub fn trigger<R: Rng + ?Sized>(
        &mut self,
        event: &str,
        rng: &mut R,
        now: DateTime<Local>,
    ) -> Result<TickOutcome, SimError> {
        let index = self
            .events
            .iter()
            .position(|e| e.name == event)
            .ok_or_else(|| SimError::UnknownTarget(event.to_string()))?;
        self.run_event(index, rng, now)
    }

    /// Ambient drift on every series and distribution.
    pub fn refresh<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Local>) {
        let today = now.date_naive();
        for (key, rule) in &self.series_rules {
            if let Some(series) = self.state.series.get_mut(key) {
                rule.apply(series, today, rng);
            }
        }
        for (key, rule) in &self.distribution_rules {
            if let Some(dist) = self.state.distributions.get_mut(key) {
                rule.apply(dist, rng);
            }
        }
    }

    /// Snapshot the current state without mutating it.
    pub fn capture(&self, at: DateTime<Utc>) -> SnapshotPayload {
        SnapshotPayload::capture(self.state.snapshot(), at)
    }

    fn run_event<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        rng: &mut R,
        now: DateTime<Local>,
    ) -> Result<TickOutcome, SimError> {
        let event = &self.events[index];
        if !event
            .requires
            .iter()
            .all(|p| self.state.precondition_holds(p))
        {
            return Ok(TickOutcome::Skipped {
                event: event.name.clone(),
                reason: SkipReason::PreconditionUnmet,
            });
        }
        if event.chance < 1.0 && !rng.random_bool(event.chance) {
            return Ok(TickOutcome::Skipped {
                event: event.name.clone(),
                reason: SkipReason::ChanceMissed,
            });
        }
        let report = self.state.apply_event(
            event,
            self.vocabulary.as_ref(),
            rng,
            now.with_timezone(&Utc),
        )?;
        Ok(TickOutcome::Event(report))
    }
}
