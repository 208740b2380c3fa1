//! Courier error types

use std::fmt;
use std::time::Duration;

/// Transport failure classification.
///
/// The first four kinds are transient and retried by the backoff policy;
/// `Other` covers everything the transport could not attribute (TLS
/// failures, malformed bodies, redirect loops) and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    TimedOut,
    ConnectionLost,
    NotConnected,
    HostResolution,
    Other,
}

impl NetworkErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, NetworkErrorKind::Other)
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkErrorKind::TimedOut => "timed out",
            NetworkErrorKind::ConnectionLost => "connection lost",
            NetworkErrorKind::NotConnected => "not connected",
            NetworkErrorKind::HostResolution => "host resolution failed",
            NetworkErrorKind::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// Courier error types
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    // Request construction
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    // Transport errors
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("server error ({status})")]
    Server { status: u16, body: Option<String> },

    // Data errors
    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    #[error("no data in response")]
    NoData,

    // Local admission control
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("request queue full for {path}")]
    QueueFull { path: String },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CourierError {
    /// Build a network error of the given kind.
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        CourierError::Network {
            kind,
            message: message.into(),
        }
    }

    /// Whether the backoff policy should try the same origin again.
    ///
    /// Only transport-level failures qualify. Server responses, whatever
    /// their status, are terminal for the origin that produced them.
    pub fn is_transient(&self) -> bool {
        matches!(self, CourierError::Network { kind, .. } if kind.is_transient())
    }

    /// Whether the failover policy should resubmit to the secondary origin.
    pub fn is_failover_trigger(&self) -> bool {
        matches!(self, CourierError::Server { status: 503, .. })
    }

    /// Remaining wait carried by a `RateLimited` error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CourierError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Local admission rejections; the caller should retry shortly.
    pub fn is_try_again_shortly(&self) -> bool {
        matches!(
            self,
            CourierError::RateLimited { .. } | CourierError::QueueFull { .. }
        )
    }

    /// Failures a user would see as a connection problem.
    pub fn is_connection_problem(&self) -> bool {
        matches!(
            self,
            CourierError::Network { .. }
                | CourierError::Server { .. }
                | CourierError::InvalidResponse(_)
        )
    }

    /// HTTP status carried by a `Server` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            CourierError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        CourierError::DecodingFailed(err.to_string())
    }
}

/// Result type alias for Courier operations
pub type Result<T> = std::result::Result<T, CourierError>;
