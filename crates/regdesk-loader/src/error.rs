//! Load failure taxonomy.

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Substrings that mark a failure message as a network-level problem.
const TRANSPORT_MARKERS: &[&str] = &[
    "failed to fetch",
    "networkerror",
    "network error",
    "network request failed",
    "load failed",
    "connection refused",
    "connection reset",
    "connection closed",
    "econnrefused",
    "enotfound",
    "dns error",
    "offline",
];

/// Why a load attempt did not produce data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The attempt was superseded or torn down.
    #[error("Load cancelled")]
    Cancelled,

    /// The deadline fired before the fetch settled.
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Network-level failure.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The backend rejected the operation.
    #[error("{0}")]
    Operation(String),
}

/// Payload-free discriminant of [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    Cancelled,
    DeadlineExceeded,
    Transport,
    Operation,
}

impl LoadErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [LoadErrorKind; 4] = [
        Self::Cancelled,
        Self::DeadlineExceeded,
        Self::Transport,
        Self::Operation,
    ];

    /// Get the name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Transport => "transport",
            Self::Operation => "operation",
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl LoadError {
    /// Classify a free-form failure message.
    ///
    /// Messages that look like connectivity problems become
    /// [`LoadError::Transport`]; everything else is passed through as
    /// [`LoadError::Operation`].
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transport_message(&message) {
            Self::Transport(message)
        } else {
            Self::Operation(message)
        }
    }

    /// Get the kind of this error.
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Cancelled => LoadErrorKind::Cancelled,
            Self::DeadlineExceeded(_) => LoadErrorKind::DeadlineExceeded,
            Self::Transport(_) => LoadErrorKind::Transport,
            Self::Operation(_) => LoadErrorKind::Operation,
        }
    }

    /// Check if this is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Message suitable for display next to a retry affordance.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "The request was cancelled.".to_string(),
            Self::DeadlineExceeded(_) => {
                "The request took too long to complete. Please try again.".to_string()
            }
            Self::Transport(_) => {
                "Unable to reach the server. Please check your internet connection and try again."
                    .to_string()
            }
            Self::Operation(message) => message.clone(),
        }
    }
}

fn is_transport_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSPORT_MARKERS.iter().any(|marker| lower.contains(marker))
}

impl From<String> for LoadError {
    fn from(message: String) -> Self {
        Self::from_message(message)
    }
}

impl From<&str> for LoadError {
    fn from(message: &str) -> Self {
        Self::from_message(message)
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::Transport(e.to_string()),
            _ => Self::Operation(e.to_string()),
        }
    }
}

impl From<Infallible> for LoadError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}
