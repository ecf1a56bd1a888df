//! Error types
//!
//! Every fallible operation in the crate returns [`ConvertError`]. Backend
//! reported failures (`failed` status) and timeouts are *not* errors: they
//! are ordinary outcomes of the poller (see [`crate::poller::PollOutcome`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Classification of transport-level failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Could not connect to the backend
    Connect,
    /// The request timed out
    Timeout,
    /// Backend answered with a non-success HTTP status
    HttpStatus(u16),
    /// Response body could not be decoded
    Decode,
    /// Anything else reported by the HTTP stack
    Other,
}

/// Errors produced by the conversion client
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Submission endpoint answered with a non-2xx status
    #[error("Server error: {status} {status_text}")]
    Server { status: u16, status_text: String },

    /// Submission succeeded but the body carried no task id
    #[error("No task ID returned from server")]
    MissingTaskId,

    /// Polling was started without a task id
    #[error("Task ID is missing")]
    TaskIdMissing,

    /// Transport failure talking to the backend
    #[error("{message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// Invalid configuration or caller input
    #[error("invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    /// Local file I/O failed
    #[error("I/O error at {path:?}: {message}")]
    Storage { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether a poll that failed with this error may simply be retried on
    /// the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { kind, .. } => !matches!(kind, NetworkErrorKind::HttpStatus(s) if *s == 404 || *s == 410),
            Self::Json(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ConvertError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else if err.is_decode() {
            NetworkErrorKind::Decode
        } else if let Some(status) = err.status() {
            NetworkErrorKind::HttpStatus(status.as_u16())
        } else {
            NetworkErrorKind::Other
        };
        Self::network(kind, err.to_string())
    }
}
