//! Server error types.

use std::fmt;

use rotorhub_core::TransportError;

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, missing TLS certs, no
    /// credentials, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error (connection failure, I/O error, etc.).
    ///
    /// May be transient (network issues) or fatal (bind address in use).
    Transport(String),

    /// Protocol error (invalid frame, undecodable request).
    ///
    /// Fatal for that stream; the server keeps serving other clients.
    Protocol(String),

    /// Internal error. Indicates a bug.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<rotorhub_proto::ProtocolError> for ServerError {
    fn from(err: rotorhub_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<TransportError> for ServerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => Self::Transport(e.to_string()),
            TransportError::Protocol(e) => Self::Protocol(e.to_string()),
        }
    }
}
