use thiserror::Error;

/// Which side of the provider boundary failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFault {
    /// No credential configured; the provider was never contacted.
    Unavailable,
    /// The upstream call failed or returned a non-success status.
    Upstream,
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Provider {
        kind: ProviderFault,
        status: u16,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LookupError {
    pub fn provider_unavailable() -> Self {
        LookupError::Provider {
            kind: ProviderFault::Unavailable,
            status: 503,
            message: "Lookup provider unavailable".to_string(),
        }
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        LookupError::Provider {
            kind: ProviderFault::Upstream,
            status,
            message: message.into(),
        }
    }

    /// Status code the HTTP layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            LookupError::Validation(_) => 400,
            LookupError::Provider { status, .. } => *status,
            LookupError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
