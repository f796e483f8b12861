use crate::types::provider_kind::ProviderKind;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication with {provider} failed: {reason}")]
    Auth {
        provider: ProviderKind,
        reason: String,
    },

    #[error("Network request failed for {url}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Request {url} not successful. Code {status}. Reason: {reason}")]
    Upstream {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Failed to parse JSON response of {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} fetches one variable per request but none was given")]
    MissingVariable { provider: ProviderKind },
}

impl ProviderError {
    pub(crate) fn transport(url: &str, source: impl Into<BoxError>) -> Self {
        ProviderError::Transport {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// HTTP status of an upstream failure, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth { .. })
    }
}
