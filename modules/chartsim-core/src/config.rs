//! Declarative role configuration. A role is data: counters, series,
//! distributions, a weight table and a sleep band. `validate` checks every
//! cross-reference once so a running engine never meets a dangling name.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;

use crate::alerts::{AlertSeed, AlertVocabulary};
use crate::distribution::{Band, DistributionRule};
use crate::error::ConfigError;
use crate::events::{CategoryPick, Effect, EventSpec, Precondition};
use crate::series::{Bucket, SeriesRule};
use crate::snapshot::Scope;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesConfig {
    pub key: String,
    pub buckets: Vec<Bucket>,
    pub rule: SeriesRule,
}

impl SeriesConfig {
    pub fn new(key: &str, buckets: &[(&str, u64)], rule: SeriesRule) -> Self {
        Self {
            key: key.to_string(),
            buckets: buckets.iter().map(|(n, v)| Bucket::new(*n, *v)).collect(),
            rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionConfig {
    pub key: String,
    pub entries: Vec<(String, u64)>,
    pub band: Band,
    pub overrides: Vec<(String, Band)>,
    pub rule: DistributionRule,
}

impl DistributionConfig {
    pub fn new(key: &str, entries: &[(&str, u64)], band: Band, rule: DistributionRule) -> Self {
        Self {
            key: key.to_string(),
            entries: entries.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            band,
            overrides: Vec::new(),
            rule,
        }
    }

    pub fn override_band(mut self, category: &str, band: Band) -> Self {
        self.overrides.push((category.to_string(), band));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub key: String,
    pub cap: usize,
    pub seeds: Vec<AlertSeed>,
    pub vocabulary: AlertVocabulary,
}

/// What a weight-table slot does when selected.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpec {
    Event(EventSpec),
    /// Ambient drift without publishing.
    Refresh,
    /// Ambient drift, then publish a snapshot.
    Publish,
}

/// Uniform random pause between ticks, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepBand {
    pub min: f64,
    pub max: f64,
}

impl SleepBand {
    pub fn from_secs(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds finite and non-negative, `min <= max`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.min.is_finite() && self.max.is_finite();
        if !finite || self.min < 0.0 || self.min > self.max {
            return Err(ConfigError::InvalidSleepBand {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Zero for a band that fails `validate`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.validate().is_err() {
            return Duration::ZERO;
        }
        let secs = rng.random_range(self.min..=self.max);
        Duration::try_from_secs_f64(secs).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleConfig {
    pub role: String,
    pub actor_id: String,
    pub scope: Scope,
    pub counters: Vec<(String, u64)>,
    pub series: Vec<SeriesConfig>,
    pub distributions: Vec<DistributionConfig>,
    pub alerts: Option<AlertConfig>,
    pub table: Vec<(f64, ActionSpec)>,
    pub sleep: SleepBand,
}

impl RoleConfig {
    pub fn new(role: &str, actor_id: &str, scope: Scope, sleep: SleepBand) -> Self {
        Self {
            role: role.to_string(),
            actor_id: actor_id.to_string(),
            scope,
            counters: Vec::new(),
            series: Vec::new(),
            distributions: Vec::new(),
            alerts: None,
            table: Vec::new(),
            sleep,
        }
    }

    pub fn counter(mut self, key: &str, initial: u64) -> Self {
        self.counters.push((key.to_string(), initial));
        self
    }

    pub fn series(mut self, series: SeriesConfig) -> Self {
        self.series.push(series);
        self
    }

    pub fn distribution(mut self, distribution: DistributionConfig) -> Self {
        self.distributions.push(distribution);
        self
    }

    pub fn alerts(mut self, alerts: AlertConfig) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Append a weight-table slot with cumulative upper bound `bound`.
    pub fn on(mut self, bound: f64, action: ActionSpec) -> Self {
        self.table.push((bound, action));
        self
    }

    pub fn with_actor_id(mut self, actor_id: &str) -> Self {
        self.actor_id = actor_id.to_string();
        self
    }

    pub fn with_sleep(mut self, sleep: SleepBand) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn events(&self) -> impl Iterator<Item = &EventSpec> {
        self.table.iter().filter_map(|(_, action)| match action {
            ActionSpec::Event(event) => Some(event),
            _ => None,
        })
    }

    /// Cross-reference checks. Structural checks on series, distributions
    /// and the weight table happen when the engine builds them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sleep.validate()?;

        let mut keys = HashSet::new();
        let payload_keys = self
            .counters
            .iter()
            .map(|(k, _)| k.as_str())
            .chain(self.series.iter().map(|s| s.key.as_str()))
            .chain(self.distributions.iter().map(|d| d.key.as_str()))
            .chain(self.alerts.iter().map(|a| a.key.as_str()));
        for key in payload_keys {
            if !keys.insert(key) {
                return Err(ConfigError::DuplicateName(key.to_string()));
            }
        }

        let mut event_names = HashSet::new();
        for event in self.events() {
            if !event_names.insert(event.name.as_str()) {
                return Err(ConfigError::DuplicateName(event.name.clone()));
            }
            self.validate_event(event)?;
        }
        Ok(())
    }

    fn validate_event(&self, event: &EventSpec) -> Result<(), ConfigError> {
        if !(event.chance > 0.0 && event.chance <= 1.0) {
            return Err(ConfigError::InvalidChance {
                event: event.name.clone(),
                chance: event.chance,
            });
        }
        if let Some(draw) = &event.amount {
            for range in draw.ranges() {
                range.validate(&event.name)?;
            }
        }
        if matches!(&event.subject, Some(v) if v.is_empty()) {
            return Err(ConfigError::EmptyVocabulary {
                event: event.name.clone(),
            });
        }

        for precondition in &event.requires {
            match precondition {
                Precondition::Positive(counter) => self.check_counter(counter)?,
                Precondition::Exceeds { counter, other } => {
                    self.check_counter(counter)?;
                    self.check_counter(other)?;
                }
                Precondition::UnresolvedAlert => self.check_alerts()?,
            }
        }

        for effect in &event.effects {
            if effect.uses_amount() && event.amount.is_none() {
                return Err(ConfigError::MissingAmount {
                    event: event.name.clone(),
                });
            }
            match effect {
                Effect::Counter { name, .. } => self.check_counter(name)?,
                Effect::Transfer {
                    distribution,
                    category,
                    ..
                } => {
                    if matches!(category, CategoryPick::Classified(_)) && event.subject.is_none() {
                        return Err(ConfigError::MissingSubject {
                            event: event.name.clone(),
                        });
                    }
                    if let CategoryPick::Uniform(names) = category {
                        if names.is_empty() {
                            return Err(ConfigError::EmptyVocabulary {
                                event: event.name.clone(),
                            });
                        }
                    }
                    let dist = self
                        .distributions
                        .iter()
                        .find(|d| &d.key == distribution)
                        .ok_or_else(|| ConfigError::UnknownDistribution(distribution.clone()))?;
                    for candidate in category.candidates() {
                        if !dist.entries.iter().any(|(n, _)| n == candidate) {
                            return Err(ConfigError::UnknownCategory {
                                distribution: distribution.clone(),
                                category: candidate.to_string(),
                            });
                        }
                    }
                }
                Effect::RaiseAlert | Effect::ResolveAlert => self.check_alerts()?,
            }
        }
        Ok(())
    }

    fn check_counter(&self, name: &str) -> Result<(), ConfigError> {
        if self.counters.iter().any(|(k, _)| k == name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownCounter(name.to_string()))
        }
    }

    fn check_alerts(&self) -> Result<(), ConfigError> {
        match &self.alerts {
            Some(alerts) if !alerts.vocabulary.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingAlertFeed {
                role: self.role.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Delta;

    fn base() -> RoleConfig {
        RoleConfig::new("test", "test_001", Scope::Users, SleepBand::from_secs(1.0, 2.0))
            .counter("orders", 1)
            .distribution(DistributionConfig::new(
                "mix",
                &[("A", 10), ("B", 10)],
                Band::new(5, 15),
                DistributionRule::Static,
            ))
    }

    #[test]
    fn valid_config_passes() {
        let cfg = base().on(
            1.0,
            ActionSpec::Event(
                EventSpec::new("bump")
                    .effect(Effect::counter("orders", Delta::Fixed(1)))
                    .effect(Effect::transfer("mix", CategoryPick::fixed("A"), Delta::Fixed(1))),
            ),
        );
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn unknown_references_are_rejected() {
        let cfg = base().on(
            1.0,
            ActionSpec::Event(
                EventSpec::new("bad").effect(Effect::counter("missing", Delta::Fixed(1))),
            ),
        );
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::UnknownCounter("missing".into()))
        );

        let cfg = base().on(
            1.0,
            ActionSpec::Event(EventSpec::new("bad").effect(Effect::transfer(
                "mix",
                CategoryPick::uniform(&["A", "Z"]),
                Delta::Fixed(1),
            ))),
        );
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn amount_effects_need_a_draw() {
        let cfg = base().on(
            1.0,
            ActionSpec::Event(EventSpec::new("pay").effect(Effect::counter("orders", Delta::Amount))),
        );
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingAmount { .. })
        ));
    }

    #[test]
    fn alert_effects_need_a_feed() {
        let cfg = base().on(1.0, ActionSpec::Event(EventSpec::new("alarm").effect(Effect::RaiseAlert)));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingAlertFeed { .. })
        ));
    }

    #[test]
    fn duplicate_payload_keys_are_rejected() {
        let cfg = base().counter("mix", 0);
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicateName("mix".into())));
    }

    #[test]
    fn inverted_sleep_band_is_rejected() {
        let cfg = base().with_sleep(SleepBand::from_secs(4.0, 2.0));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidSleepBand { .. })
        ));
    }

    #[test]
    fn negative_or_nan_sleep_bands_are_rejected() {
        for band in [
            SleepBand::from_secs(-1.0, 2.0),
            SleepBand::from_secs(f64::NAN, 2.0),
            SleepBand::from_secs(1.0, f64::INFINITY),
        ] {
            let cfg = base().with_sleep(band);
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidSleepBand { .. })
            ));
            assert_eq!(band.sample(&mut rand::rng()), Duration::ZERO);
        }
    }
}
