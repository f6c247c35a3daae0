use thiserror::Error;

/// Raised while validating a role configuration. Fatal: no loop starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("weight table is empty")]
    EmptyWeightTable,

    #[error("weight bound {bound} at index {index} is outside (0, 1]")]
    BoundOutOfRange { index: usize, bound: f64 },

    #[error("weight bound {bound} at index {index} is below the previous bound {previous}")]
    NonMonotonicBound {
        index: usize,
        bound: f64,
        previous: f64,
    },

    #[error("weight table ends at {last}, expected 1.0")]
    UnterminatedTable { last: f64 },

    #[error("band [{min}, {max}] for '{name}' is inverted")]
    InvertedBand { name: String, min: u64, max: u64 },

    #[error("initial value {value} of '{name}' lies outside [{min}, {max}]")]
    ValueOutsideBand {
        name: String,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("drift range ({low}, {high}) for '{name}' is invalid")]
    InvalidDrift { name: String, low: f64, high: f64 },

    #[error("range [{min}, {max}] for '{name}' is inverted")]
    InvertedRange { name: String, min: i64, max: i64 },

    #[error("series '{name}' holds {len} buckets, capacity is {cap}")]
    SeriesOverCapacity { name: String, len: usize, cap: usize },

    #[error("duplicate label '{label}' in '{name}'")]
    DuplicateLabel { name: String, label: String },

    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    #[error("unknown counter '{0}'")]
    UnknownCounter(String),

    #[error("unknown distribution '{0}'")]
    UnknownDistribution(String),

    #[error("unknown category '{category}' in distribution '{distribution}'")]
    UnknownCategory {
        distribution: String,
        category: String,
    },

    #[error("event '{event}' has an empty vocabulary")]
    EmptyVocabulary { event: String },

    #[error("event '{event}' uses the drawn amount but declares no draw")]
    MissingAmount { event: String },

    #[error("event '{event}' classifies a subject but declares no subject")]
    MissingSubject { event: String },

    #[error("event '{event}' has chance {chance}, expected (0, 1]")]
    InvalidChance { event: String, chance: f64 },

    #[error("role '{role}' has alert effects but no alert feed")]
    MissingAlertFeed { role: String },

    #[error("sleep band ({min}s, {max}s) is invalid")]
    InvalidSleepBand { min: f64, max: f64 },
}

/// Failures raised while an engine runs. Caught at the per-tick boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("counter '{0}' overflowed")]
    CounterOverflow(String),

    #[error("counter '{0}' would drop below zero")]
    CounterUnderflow(String),

    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error("engine already started")]
    AlreadyStarted,

    #[error("engine is not running")]
    NotRunning,

    #[error("run duration {0:?} is too long")]
    DurationTooLong(std::time::Duration),

    #[error("tick action panicked: {0}")]
    ActionPanicked(String),
}
