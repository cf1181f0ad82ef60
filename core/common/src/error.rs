//! Common error types for mediabucket.

use thiserror::Error;

/// Top-level error type for mediabucket operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The given path or URL does not belong to the platform.
    #[error("Not this platform: {0}")]
    NotThisPlatform(String),

    /// No usable credentials are configured.
    #[error("Credentials missing: {0}")]
    CredentialsMissing(String),

    /// A list, delete or head call against the storage failed.
    #[error("Transport failure{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Uploading an object failed.
    #[error("Upload failed{}: {message}", status_suffix(.status))]
    UploadFailed {
        status: Option<u16>,
        message: String,
    },

    /// The object was uploaded but is not reachable through its public URL.
    #[error("Not public: {0}")]
    NotPublic(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The local file to export does not exist.
    #[error("Local file missing: {0}")]
    LocalFileMissing(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record store operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl Error {
    /// Build a transport error without a status code.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status reported by the storage, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } | Error::UploadFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the caller should try the next platform.
    pub fn is_not_this_platform(&self) -> bool {
        matches!(self, Error::NotThisPlatform(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_status() {
        let err = Error::Transport {
            status: Some(403),
            message: "access denied".to_string(),
        };
        assert_eq!(err.to_string(), "Transport failure (HTTP 403): access denied");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_transport_display_without_status() {
        let err = Error::transport("connection reset");
        assert_eq!(err.to_string(), "Transport failure: connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_not_this_platform() {
        assert!(Error::NotThisPlatform("x".into()).is_not_this_platform());
        assert!(!Error::NotPublic("x".into()).is_not_this_platform());
    }
}
