//! Bounded time-bucket series: months or weekdays with a rolling window.

use std::collections::HashSet;

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::error::ConfigError;
use crate::sample::{Drift, IntRange};

/// Maximum number of buckets a series retains.
pub const SERIES_CAPACITY: usize = 12;

/// One `{name, value}` entry. Also the wire shape of distribution entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub name: String,
    pub value: u64,
}

impl Bucket {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Which calendar unit labels a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// `Jan`, `Feb`, ...
    Month,
    /// `Mon`, `Tue`, ...
    Weekday,
}

impl Period {
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Month => date.format("%b").to_string(),
            Self::Weekday => date.format("%a").to_string(),
        }
    }
}

/// Ordered series with unique labels, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucketSeries {
    buckets: Vec<Bucket>,
}

impl TimeBucketSeries {
    pub fn new(name: &str, buckets: Vec<Bucket>) -> Result<Self, ConfigError> {
        if buckets.len() > SERIES_CAPACITY {
            return Err(ConfigError::SeriesOverCapacity {
                name: name.to_string(),
                len: buckets.len(),
                cap: SERIES_CAPACITY,
            });
        }
        let mut seen = HashSet::new();
        for bucket in &buckets {
            if !seen.insert(bucket.name.as_str()) {
                return Err(ConfigError::DuplicateLabel {
                    name: name.to_string(),
                    label: bucket.name.clone(),
                });
            }
        }
        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.buckets.iter().find(|b| b.name == label).map(|b| b.value)
    }

    /// Perturb every bucket in place.
    pub fn drift<R: Rng + ?Sized>(&mut self, drift: &Drift, rng: &mut R) {
        for bucket in &mut self.buckets {
            bucket.value = drift.apply(bucket.value, rng);
        }
    }

    /// Open a bucket for `label` if it is not already present, evicting the
    /// oldest bucket when the series is full. Returns whether a bucket was
    /// appended.
    pub fn rollover(&mut self, label: &str, seed: u64) -> bool {
        if self.get(label).is_some() {
            return false;
        }
        if self.buckets.len() >= SERIES_CAPACITY {
            self.buckets.remove(0);
        }
        self.buckets.push(Bucket::new(label, seed));
        true
    }

    /// Add to the bucket labelled `label`. Missing labels are left alone.
    pub fn accumulate(&mut self, label: &str, amount: u64) -> bool {
        match self.buckets.iter_mut().find(|b| b.name == label) {
            Some(bucket) => {
                bucket.value = bucket.value.saturating_add(amount);
                true
            }
            None => false,
        }
    }
}

/// Ambient per-tick update for a series.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesRule {
    /// Drift every bucket, then roll the current period in with a fresh seed.
    Drift {
        drift: Drift,
        seed: IntRange,
        period: Period,
    },
    /// Add a random increment to the current period's bucket only.
    Accumulate { add: IntRange, period: Period },
}

impl SeriesRule {
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self {
            Self::Drift { drift, seed, .. } => {
                drift.validate(name)?;
                seed.validate(name)
            }
            Self::Accumulate { add, .. } => add.validate(name),
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, series: &mut TimeBucketSeries, today: NaiveDate, rng: &mut R) {
        match self {
            Self::Drift {
                drift,
                seed,
                period,
            } => {
                series.drift(drift, rng);
                let label = period.label(today);
                if series.get(&label).is_none() {
                    series.rollover(&label, seed.sample_unsigned(rng));
                }
            }
            Self::Accumulate { add, period } => {
                series.accumulate(&period.label(today), add.sample_unsigned(rng));
            }
        }
    }
}
