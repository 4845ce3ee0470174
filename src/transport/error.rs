//! Transport error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// Human-readable message. For `Server` errors this is the remote
    /// message verbatim.
    pub message: String,
    /// Machine-readable code from the error envelope, when one was sent
    pub code: Option<String>,
    /// HTTP status, when a response reached the caller
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            status: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Server, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Malformed, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// No response reached the caller (connect failure, timeout, reset)
    Network,
    /// The service reported a failure (error envelope or non-2xx status)
    Server,
    /// The response body is not the documented envelope or payload shape
    Malformed,
}

impl TransportErrorKind {
    /// Whether the next poll or retry is expected to recover on its own.
    ///
    /// Malformed responses are recovered the same way as network errors:
    /// the previous value stays and the next attempt may succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Malformed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
