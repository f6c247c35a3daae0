use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Error,
    Warning,
    Info,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSeed {
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
}

impl AlertSeed {
    pub fn new(kind: AlertKind, title: &str, description: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

/// Words a raised alert is assembled from. Each field is picked
/// independently.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertVocabulary {
    pub kinds: Vec<AlertKind>,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
}

impl AlertVocabulary {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty() || self.titles.is_empty() || self.descriptions.is_empty()
    }
}

/// Rolling list of recent alerts, newest last.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertFeed {
    cap: usize,
    alerts: VecDeque<Alert>,
    next_id: u64,
}

impl AlertFeed {
    pub fn new(cap: usize, seeds: &[AlertSeed], now: DateTime<Utc>) -> Self {
        let mut feed = Self {
            cap,
            alerts: VecDeque::with_capacity(cap + 1),
            next_id: 1,
        };
        for seed in seeds {
            feed.push(seed.kind, seed.title.clone(), seed.description.clone(), now);
        }
        feed
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn has_unresolved(&self) -> bool {
        self.alerts.iter().any(|a| !a.resolved)
    }

    pub fn raise<R: Rng + ?Sized>(
        &mut self,
        vocabulary: &AlertVocabulary,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Option<&Alert> {
        let kind = *vocabulary.kinds.choose(rng)?;
        let title = vocabulary.titles.choose(rng)?.clone();
        let description = vocabulary.descriptions.choose(rng)?.clone();
        self.push(kind, title, description, now);
        self.alerts.back()
    }

    /// Resolve one unresolved alert at random.
    pub fn resolve_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&Alert> {
        let open: Vec<usize> = self
            .alerts
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.resolved)
            .map(|(i, _)| i)
            .collect();
        let index = *open.choose(rng)?;
        let alert = &mut self.alerts[index];
        alert.resolved = true;
        Some(&*alert)
    }

    fn push(&mut self, kind: AlertKind, title: String, description: String, now: DateTime<Utc>) {
        self.alerts.push_back(Alert {
            id: self.next_id.to_string(),
            kind,
            title,
            description,
            timestamp: now,
            resolved: false,
        });
        self.next_id += 1;
        while self.alerts.len() > self.cap {
            self.alerts.pop_front();
        }
    }
}
