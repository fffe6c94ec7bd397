//! Error types for session operations.
//!
//! Every failure a caller can observe is a [`CoreError`]. Each variant
//! belongs to one [`ErrorKind`], and each kind has a stable numeric code
//! (HTTP-style) used on the wire.

use thiserror::Error;

use crate::{
    device::DeviceError,
    validation::{PlaintextError, SettingsError},
};

/// Error classes visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No session with that id
    NotFound,
    /// Caller may not act on the session
    Forbidden,
    /// Request shape or content rejected
    InvalidInput,
    /// Session state does not permit the operation
    Conflict,
    /// Device rejected the operation
    DeviceFailure,
    /// Internal failure
    Unexpected,
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForbiddenReason {
    /// Caller identity could not be resolved
    Unauthenticated,
    /// Caller is not the session owner
    NotOwner,
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "caller identity could not be resolved"),
            Self::NotOwner => write!(f, "caller does not own this session"),
        }
    }
}

/// Errors returned by the session service and registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Session id unknown, malformed, or deleted
    #[error("session {0} not found")]
    NotFound(String),

    /// Access denied
    #[error("{0}")]
    Forbidden(ForbiddenReason),

    /// Invalid wheel settings or settings request
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// Invalid plaintext
    #[error("invalid plaintext: {0}")]
    InvalidPlaintext(#[from] PlaintextError),

    /// Operation needs a configured device
    #[error("{0}")]
    Conflict(String),

    /// Device rejected the operation
    #[error("device failure: {0}")]
    DeviceFailure(DeviceError),

    /// Internal failure
    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl CoreError {
    /// Error class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidSettings(_) | Self::InvalidPlaintext(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::DeviceFailure(_) => ErrorKind::DeviceFailure,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Stable wire code.
    ///
    /// Unresolved identity reports 401, a non-owner 403.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(ForbiddenReason::Unauthenticated) => 401,
            Self::Forbidden(ForbiddenReason::NotOwner) => 403,
            Self::InvalidSettings(_) | Self::InvalidPlaintext(_) => 400,
            Self::Conflict(_) => 409,
            Self::DeviceFailure(_) | Self::Unexpected(_) => 500,
        }
    }

    /// Shorthand for the unconfigured-device conflict.
    pub(crate) fn not_configured() -> Self {
        Self::Conflict("device is not configured".to_owned())
    }
}

impl From<DeviceError> for CoreError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::NotConfigured => Self::not_configured(),
            DeviceError::InvalidSettings(settings) => Self::InvalidSettings(settings),
            other @ DeviceError::Faulted(_) => Self::DeviceFailure(other),
        }
    }
}
