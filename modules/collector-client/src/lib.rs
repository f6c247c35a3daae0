pub mod error;
pub mod types;

pub use error::{CollectorError, Result};
pub use types::Ack;

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;

pub struct CollectorClient {
    client: reqwest::Client,
    base_url: String,
}

impl CollectorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| CollectorError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CollectorError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST an analytics snapshot. Any 2xx counts as accepted.
    pub async fn post_analytics<T: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &T,
    ) -> Result<Ack> {
        let url = self.endpoint(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = serde_json::from_str::<Ack>(&text)
                .ok()
                .and_then(|ack| ack.message)
                .unwrap_or(text);
            return Err(CollectorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(url = url.as_str(), status = status.as_u16(), "Collector accepted snapshot");
        // Some collector builds answer 204 or plain text.
        Ok(serde_json::from_str(&text).unwrap_or(Ack {
            success: true,
            message: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_doubled_slashes() {
        let client = CollectorClient::new("http://localhost:3000/api/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint("/analytics/dashboard"),
            "http://localhost:3000/api/v1/analytics/dashboard"
        );
        assert_eq!(
            client.endpoint("analytics/users/buyer_001"),
            "http://localhost:3000/api/v1/analytics/users/buyer_001"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            CollectorClient::new("localhost:3000", Duration::from_secs(5)),
            Err(CollectorError::InvalidUrl { .. })
        ));
        assert!(matches!(
            CollectorClient::new("not a url", Duration::from_secs(5)),
            Err(CollectorError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn ack_tolerates_missing_fields() {
        let ack: Ack = serde_json::from_str(r#"{"message":"stored"}"#).unwrap();
        assert!(!ack.success);
        assert_eq!(ack.message.as_deref(), Some("stored"));
    }
}
