use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerts::Alert;
use crate::series::Bucket;

/// Collector endpoint family an actor publishes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Platform-wide dashboard, not keyed by actor.
    Dashboard,
    Users,
    Hubs,
    Groups,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dashboard => write!(f, "dashboard"),
            Self::Users => write!(f, "users"),
            Self::Hubs => write!(f, "hubs"),
            Self::Groups => write!(f, "shg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub scope: Scope,
    pub actor_id: String,
}

impl Destination {
    pub fn new(scope: Scope, actor_id: impl Into<String>) -> Self {
        Self {
            scope,
            actor_id: actor_id.into(),
        }
    }

    /// Path relative to the collector base URL.
    pub fn path(&self) -> String {
        match self.scope {
            Scope::Dashboard => "analytics/dashboard".to_string(),
            scope => format!("analytics/{scope}/{}", self.actor_id),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Count(u64),
    Buckets(Vec<Bucket>),
    Alerts(Vec<Alert>),
}

/// Flattened view of an actor's state, keyed by payload field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SnapshotData(BTreeMap<String, SnapshotValue>);

impl SnapshotData {
    pub fn insert(&mut self, key: impl Into<String>, value: SnapshotValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotValue> {
        self.0.get(key)
    }

    pub fn count(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            SnapshotValue::Count(v) => Some(*v),
            _ => None,
        }
    }

    pub fn buckets(&self, key: &str) -> Option<&[Bucket]> {
        match self.0.get(key)? {
            SnapshotValue::Buckets(b) => Some(b),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body posted to the collector: `{success, data, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotPayload {
    pub success: bool,
    pub data: SnapshotData,
    pub timestamp: DateTime<Utc>,
}

impl SnapshotPayload {
    pub fn capture(data: SnapshotData, at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            data,
            timestamp: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_path_has_no_actor_segment() {
        assert_eq!(
            Destination::new(Scope::Dashboard, "admin_001").path(),
            "analytics/dashboard"
        );
        assert_eq!(
            Destination::new(Scope::Hubs, "hub_001").path(),
            "analytics/hubs/hub_001"
        );
        assert_eq!(
            Destination::new(Scope::Groups, "shg_001").path(),
            "analytics/shg/shg_001"
        );
    }

    #[test]
    fn payload_wire_shape() {
        let mut data = SnapshotData::default();
        data.insert("totalSpent", SnapshotValue::Count(285_000));
        data.insert(
            "monthlySpending",
            SnapshotValue::Buckets(vec![Bucket::new("Jan", 45_000)]),
        );
        let at = DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_value(SnapshotPayload::capture(data, at)).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["totalSpent"], 285_000);
        assert_eq!(json["data"]["monthlySpending"][0]["name"], "Jan");
        assert_eq!(json["data"]["monthlySpending"][0]["value"], 45_000);
        assert_eq!(json["timestamp"], "2024-01-15T10:30:00Z");
    }
}
