use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::snapshot::{Destination, SnapshotPayload};

/// A failed delivery. Never fatal to the loop that attempted it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PublishError {
    #[error("publish failed ({}): {message}", status.map_or_else(|| "no response".to_string(), |s| s.to_string()))]
    Transient {
        status: Option<u16>,
        message: String,
    },
}

impl PublishError {
    pub fn transient(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transient {
            status,
            message: message.into(),
        }
    }
}

/// Delivers snapshots to the collector. At most once per call, no retry.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        destination: &Destination,
        payload: &SnapshotPayload,
    ) -> Result<(), PublishError>;
}

/// Drops every snapshot. Used for dry runs.
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(
        &self,
        _destination: &Destination,
        _payload: &SnapshotPayload,
    ) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Keeps every snapshot in memory, in delivery order.
#[derive(Default)]
pub struct MemoryPublisher {
    sent: Mutex<Vec<(Destination, SnapshotPayload)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Destination, SnapshotPayload)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count_for(&self, actor_id: &str) -> usize {
        self.sent
            .lock()
            .map(|s| s.iter().filter(|(d, _)| d.actor_id == actor_id).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(
        &self,
        destination: &Destination,
        payload: &SnapshotPayload,
    ) -> Result<(), PublishError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|e| PublishError::transient(None, e.to_string()))?;
        sent.push((destination.clone(), payload.clone()));
        Ok(())
    }
}
