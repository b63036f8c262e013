use std::collections::HashMap;
use thiserror::Error;

use crate::graph::NodeId;

/// Unified error type for construction-time and scheduling misuse.
///
/// Run-time outcomes of element bodies never travel through this type; they
/// are reported as [`StatusCode`](crate::status::StatusCode) values and folded
/// into the graph status instead.
#[derive(Debug, Error)]
pub enum DagrunError {
    /// An argument outside the accepted domain (unknown severity, zero loop count, ...)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        field: Option<String>,
    },

    /// A language tag that the registry does not know
    #[error("Unsupported language: {tag}")]
    UnsupportedLanguage { tag: String },

    /// Graph wiring errors (self dependency, duplicate names)
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        context: HashMap<String, String>,
    },

    /// The dependency graph contains a cycle
    #[error("Cycle detected in graph at node '{node}'")]
    Cycle { node: String },

    /// A node handle that does not belong to the graph
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// A run was started or a counter reset while the graph is running
    #[error("Graph is already running: {operation}")]
    AlreadyRunning { operation: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Concurrency errors (closed semaphores, dropped channels)
    #[error("Concurrency error: {operation}")]
    Concurrency {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DagrunError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid argument error naming the offending field
    pub fn invalid_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn unsupported_language<S: Into<String>>(tag: S) -> Self {
        Self::UnsupportedLanguage { tag: tag.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Add context to a validation error
    pub fn with_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        if let Self::Validation { ref mut context, .. } = self {
            context.insert(key.into(), value.into());
        }
        self
    }

    pub fn cycle<S: Into<String>>(node: S) -> Self {
        Self::Cycle { node: node.into() }
    }

    pub fn already_running<S: Into<String>>(operation: S) -> Self {
        Self::AlreadyRunning {
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a concurrency error with source
    pub fn concurrency<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        operation: S,
        source: E,
    ) -> Self {
        Self::Concurrency {
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the error is a caller mistake rather than an environment failure
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Concurrency { .. } | Self::Internal { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::UnsupportedLanguage { .. } => "language",
            Self::Validation { .. } => "validation",
            Self::Cycle { .. } => "cycle",
            Self::UnknownNode(_) => "unknown_node",
            Self::AlreadyRunning { .. } => "already_running",
            Self::Configuration { .. } => "configuration",
            Self::Concurrency { .. } => "concurrency",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DagrunError>;

impl From<anyhow::Error> for DagrunError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

impl From<tokio::sync::AcquireError> for DagrunError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        Self::concurrency("acquire worker permit", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DagrunError::invalid_argument("loop count must be at least 1");
        assert!(matches!(err, DagrunError::InvalidArgument { .. }));
        assert_eq!(err.category(), "invalid_argument");
        assert!(err.is_precondition());
    }

    #[test]
    fn test_error_context() {
        let err = DagrunError::validation("node depends on itself")
            .with_context("node", "a")
            .with_context("edge", "a -> a");

        if let DagrunError::Validation { context, .. } = err {
            assert_eq!(context.get("node"), Some(&"a".to_string()));
            assert_eq!(context.get("edge"), Some(&"a -> a".to_string()));
        } else {
            panic!("Expected validation error");
        }
    }

    #[test]
    fn test_display() {
        let err = DagrunError::cycle("b");
        assert_eq!(err.to_string(), "Cycle detected in graph at node 'b'");

        let err = DagrunError::unsupported_language("fr");
        assert_eq!(err.to_string(), "Unsupported language: fr");
    }

    #[test]
    fn test_from_anyhow() {
        let err: DagrunError = anyhow::anyhow!("boom").into();
        assert_eq!(err.category(), "internal");
        assert!(!err.is_precondition());
        assert!(err.to_string().contains("boom"));
    }
}
