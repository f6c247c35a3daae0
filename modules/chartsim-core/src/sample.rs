//! Random draws shared by the series, distribution and event primitives.

use rand::Rng;

use crate::error::ConfigError;

/// Multiplicative drift: `new = current * (1 + uniform(low, high))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drift {
    pub low: f64,
    pub high: f64,
}

impl Drift {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// No variance. Useful for deterministic scenarios.
    pub const fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let finite = self.low.is_finite() && self.high.is_finite();
        if !finite || self.low > self.high || self.low <= -1.0 {
            return Err(ConfigError::InvalidDrift {
                name: name.to_string(),
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Apply one drift step, truncating toward zero.
    pub fn apply<R: Rng + ?Sized>(&self, value: u64, rng: &mut R) -> u64 {
        let pct = rng.random_range(self.low..=self.high);
        // `as` saturates, so a negative product lands on zero.
        (value as f64 * (1.0 + pct)) as u64
    }
}

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub const fn exactly(value: i64) -> Self {
        Self::new(value, value)
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedRange {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.random_range(self.min..=self.max)
    }

    /// Sample clamped at zero, for seeds and increments.
    pub fn sample_unsigned<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        self.sample(rng).max(0) as u64
    }
}
