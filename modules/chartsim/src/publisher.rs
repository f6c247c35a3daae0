use async_trait::async_trait;
use chartsim_core::{Destination, PublishError, Publisher, SnapshotPayload};
use collector_client::CollectorClient;

/// Wrapper to post snapshots through the collector REST client.
pub struct CollectorPublisher {
    client: CollectorClient,
    token_prefix: String,
}

impl CollectorPublisher {
    pub fn new(client: CollectorClient, token_prefix: String) -> Self {
        Self {
            client,
            token_prefix,
        }
    }

    fn bearer(&self, actor_id: &str) -> Option<String> {
        if self.token_prefix.is_empty() {
            None
        } else {
            Some(format!("{}{}", self.token_prefix, actor_id))
        }
    }
}

#[async_trait]
impl Publisher for CollectorPublisher {
    async fn publish(
        &self,
        destination: &Destination,
        payload: &SnapshotPayload,
    ) -> Result<(), PublishError> {
        let bearer = self.bearer(&destination.actor_id);
        self.client
            .post_analytics(&destination.path(), bearer.as_deref(), payload)
            .await
            .map(|_| ())
            .map_err(|e| PublishError::transient(e.status(), e.to_string()))
    }
}
