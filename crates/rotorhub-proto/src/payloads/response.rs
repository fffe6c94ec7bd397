//! Response envelope.

use serde::{Deserialize, Serialize};

use super::{MachineSettings, envelope_frame, open_envelope};
use crate::{Frame, Opcode, errors::Result};

/// Error payload for failed requests.
///
/// Codes follow HTTP status semantics so clients can reuse familiar handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the failure class
    pub code: u16,
    /// Human-readable message
    pub message: String,
}

impl ErrorPayload {
    /// Malformed or semantically invalid input.
    pub const INVALID_INPUT: u16 = 400;
    /// Credentials missing or not recognized.
    pub const UNAUTHENTICATED: u16 = 401;
    /// Caller may not access this machine.
    pub const FORBIDDEN: u16 = 403;
    /// Machine does not exist.
    pub const NOT_FOUND: u16 = 404;
    /// Machine is not in a state that allows the operation.
    pub const CONFLICT: u16 = 409;
    /// Anything else.
    pub const INTERNAL: u16 = 500;

    /// Build an error payload.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// A response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Machine created
    Created {
        /// New machine id
        id: String,
        /// Settings actually applied
        settings: MachineSettings,
    },
    /// Text encrypted
    Encrypted {
        /// Input echoed back
        plaintext: String,
        /// Output
        ciphertext: String,
    },
    /// Current or newly applied settings
    Settings {
        /// Wheel settings
        settings: MachineSettings,
    },
    /// Success with nothing to report
    NoContent,
    /// Channel is now a character stream bound to this machine
    StreamAccepted {
        /// Machine id
        id: String,
    },
    /// Request failed
    Error(ErrorPayload),
}

impl Response {
    /// Encode as an [`Opcode::Response`] frame echoing `request_id`.
    pub fn into_frame(&self, request_id: u32) -> Result<Frame> {
        envelope_frame(self, Opcode::Response, request_id)
    }

    /// Decode from an [`Opcode::Response`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        open_envelope(frame, Opcode::Response)
    }

    /// Error code, if this is an error response.
    #[must_use]
    pub fn error_code(&self) -> Option<u16> {
        match self {
            Self::Error(err) => Some(err.code),
            _ => None,
        }
    }
}
