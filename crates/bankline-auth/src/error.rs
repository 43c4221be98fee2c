//! Error types for credential storage and validation.

/// Error type for session storage and credential operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persistence layer cannot be used at all.
    #[error("Session storage is unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing the backing file failed.
    #[error("Storage I/O error at '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The backing file does not hold a JSON object of strings.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A credential failed structural validation.
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),
}

impl Error {
    /// Check if this error means the persistence layer is unusable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }
}

/// Result type for session storage operations.
pub type Result<T> = std::result::Result<T, Error>;
