//! Error types for tagguard

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias using tagguard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure category attached to every error at its origin.
///
/// The retry engine switches on this kind instead of inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream rate limiting
    Throttling,
    /// The call did not complete in time
    Timeout,
    /// Upstream temporarily unavailable
    Unavailable,
    /// Upstream reported an internal/service error
    InternalService,
    /// Network-level failure (reset, DNS, ...)
    Network,
    /// Connection could not be established or was dropped
    Connection,
    /// The request itself was rejected as malformed
    InvalidRequest,
    /// Short-circuited by a circuit breaker
    CircuitOpen,
    /// Anything else
    Other,
}

impl ErrorKind {
    /// Whether failures of this kind are usually transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttling
                | Self::Timeout
                | Self::Unavailable
                | Self::InternalService
                | Self::Network
                | Self::Connection
        )
    }

    /// Stable snake_case name, used as a metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Throttling => "throttling",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::InternalService => "internal_service",
            Self::Network => "network",
            Self::Connection => "connection",
            Self::InvalidRequest => "invalid_request",
            Self::CircuitOpen => "circuit_open",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type for tagguard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input to a component. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operational failure from a wrapped operation
    #[error("processing error ({kind}): {message}")]
    Processing {
        kind: ErrorKind,
        message: String,
        retryable: bool,
    },

    /// Raised by a circuit breaker that is short-circuiting calls
    #[error("circuit breaker open for dependency '{dependency}'")]
    CircuitOpen { dependency: String },

    /// Unsupported or missing video container format
    #[error("unsupported video format: {0}")]
    Format(String),

    /// Video longer than the processing cap
    #[error("video duration {duration_secs}s exceeds maximum of {max_secs}s")]
    DurationExceeded { duration_secs: f64, max_secs: f64 },

    /// Tag (or synonym) not present in the taxonomy
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// Taxonomy source missing or structurally invalid
    #[error("taxonomy error: {0}")]
    Taxonomy(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a processing error whose retryability follows its kind
    pub fn processing(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::Processing {
            kind,
            message: msg.into(),
            retryable: kind.is_transient(),
        }
    }

    /// Create a processing error that must not be retried
    pub fn fatal(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::Processing {
            kind,
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create a circuit-open error for a dependency
    pub fn circuit_open(dependency: impl Into<String>) -> Self {
        Self::CircuitOpen {
            dependency: dependency.into(),
        }
    }

    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a new unknown tag error
    pub fn unknown_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTag(tag.into())
    }

    /// Create a new taxonomy error
    pub fn taxonomy(msg: impl Into<String>) -> Self {
        Self::Taxonomy(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Failure category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Processing { kind, .. } => *kind,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::NotConnected => ErrorKind::Connection,
                std::io::ErrorKind::BrokenPipe => ErrorKind::Network,
                _ => ErrorKind::Other,
            },
            Self::Validation(_)
            | Self::Format(_)
            | Self::DurationExceeded { .. }
            | Self::UnknownTag(_)
            | Self::Config(_)
            | Self::Serialization(_) => ErrorKind::InvalidRequest,
            Self::Taxonomy(_) => ErrorKind::Other,
        }
    }

    /// Whether the error origin marked this failure as worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Processing { retryable, .. } => *retryable,
            Self::Io(_) => self.kind().is_transient(),
            _ => false,
        }
    }

    /// True for the synthetic error raised by an open circuit breaker
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}
