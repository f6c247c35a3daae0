use serde::Deserialize;

/// Envelope the collector answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
