//! Crate-wide error type
//!
//! External-call failures are carried as values so the orchestrator can
//! decide per step whether to degrade or propagate.

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source {provider}: {message}")]
    Source { provider: String, message: String },

    #[error("lookup {endpoint}: {message}")]
    Lookup { endpoint: String, message: String },
}

impl MonitorError {
    pub fn source(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn lookup(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}
