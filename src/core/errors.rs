//! Custom error types for query resolution, translation and usage lookups

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Network-level failure (connect, TLS, timeout, body read)
    #[error("Network request failed: {message}")]
    TransportError {
        /// Underlying error text
        message: String,
    },

    /// The service answered with a non-2xx status
    #[error("Service rejected request: {status} - {message}")]
    ServiceError {
        /// HTTP status
        status: u16,
        /// Service message or truncated body
        message: String,
    },

    /// The response did not carry a usable translation
    #[error("Unexpected response: {message}")]
    ProtocolError {
        /// Parse failure or missing field
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong
        message: String,
    },
}

impl TranslationError {
    /// Short, user-facing category used as a result title
    pub fn category(&self) -> &'static str {
        match self {
            TranslationError::TransportError { .. } => "Network error",
            TranslationError::ServiceError { .. } => "Service error",
            TranslationError::ProtocolError { .. } => "Unexpected response",
            TranslationError::ConfigError { .. } => "Configuration error",
        }
    }

    /// HTTP status, when the remote service produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            TranslationError::ServiceError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return TranslationError::TransportError {
                message: format!("request timed out ({})", err),
            };
        }
        if let Some(status) = err.status() {
            return TranslationError::ServiceError {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return TranslationError::ProtocolError {
                message: err.to_string(),
            };
        }
        TranslationError::TransportError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(err: serde_json::Error) -> Self {
        TranslationError::ProtocolError {
            message: err.to_string(),
        }
    }
}

/// Usage lookup errors. Never surfaced to the user as a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Network-level failure
    #[error("Usage request failed: {message}")]
    TransportError {
        /// Underlying error text
        message: String,
    },

    /// Non-2xx status
    #[error("Usage endpoint returned {status}")]
    ServiceError {
        /// HTTP status
        status: u16,
    },

    /// Malformed payload or impossible numbers
    #[error("Invalid usage response: {message}")]
    ProtocolError {
        /// Parse failure or missing field
        message: String,
    },
}

impl From<reqwest::Error> for UsageError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => UsageError::ServiceError {
                status: status.as_u16(),
            },
            None if err.is_decode() => UsageError::ProtocolError {
                message: err.to_string(),
            },
            None => UsageError::TransportError {
                message: err.to_string(),
            },
        }
    }
}

/// Query parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Nothing to translate; the host should show a prompt
    #[error("Query is empty")]
    EmptyQueryError,
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
