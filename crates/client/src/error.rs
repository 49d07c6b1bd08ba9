use roadmap_core::error::CoreError;

/// Errors from the roadmap client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connect, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured base URL cannot be extended into an endpoint.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// The backend answered with a 5xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The backend refused the request (4xx): bad input, auth, not found.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Reading or writing the local cache file failed.
    #[error("Cache I/O error: {0}")]
    Cache(#[from] std::io::Error),

    /// A response or the cache file could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The bundled curriculum could not be loaded.
    #[error(transparent)]
    Curriculum(#[from] CoreError),
}

impl ClientError {
    /// Whether the failed backend call should be replaced by the local
    /// cache. Rejections are the caller's problem and are never cached.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Server { .. })
    }
}
