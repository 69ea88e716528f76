//! Error handling for the configuration engine
//!
//! Every failure that leaves the engine is a [`GnmiError`] carrying one of
//! the status [`Code`]s a management client understands. Lower layers (the
//! schema and the typed model) have their own error types; the engine maps
//! them onto a code depending on where the failure happened.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status code reported alongside a failed RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    NotFound,
    InvalidArgument,
    Internal,
    Aborted,
    Unimplemented,
}

/// Main error type for Get/Set/Subscribe processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GnmiError {
    /// Schema or tree position absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed inbound value, key/value mismatch, unsupported encoding or model
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Violated type assumptions, serialization failures, failed rollback
    #[error("internal error: {0}")]
    Internal(String),

    /// The apply hook failed and the previous configuration was restored
    #[error("aborted: {0}")]
    Aborted(String),

    /// Deprecated path addressing or a root update
    #[error("unimplemented: {0}")]
    Unimplemented(String),
}

/// Result alias used throughout the engine
pub type GnmiResult<T> = Result<T, GnmiError>;

impl GnmiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted(message.into())
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::Unimplemented(message.into())
    }

    /// Status code of this error.
    pub fn code(&self) -> Code {
        match self {
            Self::NotFound(_) => Code::NotFound,
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::Internal(_) => Code::Internal,
            Self::Aborted(_) => Code::Aborted,
            Self::Unimplemented(_) => Code::Unimplemented,
        }
    }

    /// Human readable message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::InvalidArgument(m)
            | Self::Internal(m)
            | Self::Aborted(m)
            | Self::Unimplemented(m) => m,
        }
    }
}
