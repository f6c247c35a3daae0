use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl CollectorError {
    /// HTTP status, when the collector answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CollectorError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CollectorError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => CollectorError::Network(err.to_string()),
        }
    }
}
