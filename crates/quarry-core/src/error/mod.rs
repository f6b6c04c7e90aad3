//! Error types and result aliases for Quarry operations.
//!
//! One error type covers codec, validation, transport and configuration
//! failures so that every stage of a sync or publish can propagate with `?`.

use thiserror::Error;

/// Unified error type for all Quarry operations
#[derive(Error, Debug)]
pub enum QuarryError {
    // Codec errors
    #[error("Malformed data: {message}")]
    Codec { message: String },

    // Validation errors
    #[error("Invalid {field} '{value}': {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    // Config errors
    #[error("Failed to parse quarry.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    Configuration { field: String, reason: String },

    // Transport errors
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Network error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Storage errors
    #[error("Integrity check failed for {artifact}: expected {expected}, got {actual}")]
    IntegrityFailure {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Quarry operations
pub type QuarryResult<T> = Result<T, QuarryError>;

impl QuarryError {
    /// Create a codec error for malformed input
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create a validation error for a rejected field value
    pub fn validation(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error from any error type
    pub fn transport<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QuarryError::Transport { .. } | QuarryError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            QuarryError::NotFound { .. } => {
                Some("Check the remote URL; it must point at a compact index root")
            },
            QuarryError::Transport { .. } => Some("Check your internet connection and try again"),
            QuarryError::Configuration { .. } | QuarryError::TomlParse { .. } => {
                Some("Run 'quarry check' to validate quarry.toml")
            },
            QuarryError::IntegrityFailure { .. } => {
                Some("The remote index changed while syncing; run the sync again")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuarryError::validation("name", "bad name", "must match [\\w.-]+");
        assert_eq!(
            err.to_string(),
            "Invalid name 'bad name': must match [\\w.-]+"
        );

        let err = QuarryError::codec("unexpected end of stream");
        assert_eq!(err.to_string(), "Malformed data: unexpected end of stream");
    }

    #[test]
    fn test_recoverable() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(QuarryError::io("write".to_string(), io).is_recoverable());
        assert!(!QuarryError::codec("x").is_recoverable());
        assert!(!QuarryError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_suggestion() {
        assert!(QuarryError::configuration("remote.url", "missing")
            .suggestion()
            .is_some());
        assert!(QuarryError::codec("x").suggestion().is_none());
    }
}
