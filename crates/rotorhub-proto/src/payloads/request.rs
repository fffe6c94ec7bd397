//! Request envelope.

use serde::{Deserialize, Serialize};

use super::{SettingsRequest, envelope_frame, open_envelope};
use crate::{Frame, Opcode, errors::Result};

/// Caller credentials, resolved to an identity by the server.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Shared secret
    pub password: String,
}

impl Credentials {
    /// Credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Credentials carrying nothing (an unauthenticated caller).
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operation requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a new cipher machine owned by the caller
    CreateMachine(SettingsRequest),
    /// Encrypt text on an existing machine
    Encrypt {
        /// Machine id
        id: String,
        /// Letters and whitespace only
        plaintext: String,
    },
    /// Replace a machine's wheel settings
    UpdateSettings {
        /// Machine id
        id: String,
        /// New settings
        request: SettingsRequest,
    },
    /// Read a machine's wheel settings
    GetSettings {
        /// Machine id
        id: String,
    },
    /// Return a machine's rotors to their initial position
    Reset {
        /// Machine id
        id: String,
    },
    /// Destroy a machine
    Delete {
        /// Machine id
        id: String,
    },
    /// Switch this channel into character streaming mode
    OpenStream {
        /// Machine id
        id: String,
        /// Settings to apply before accepting, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preconfigure: Option<SettingsRequest>,
    },
}

impl Operation {
    /// Short operation name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMachine(_) => "create",
            Self::Encrypt { .. } => "encrypt",
            Self::UpdateSettings { .. } => "update_settings",
            Self::GetSettings { .. } => "get_settings",
            Self::Reset { .. } => "reset",
            Self::Delete { .. } => "delete",
            Self::OpenStream { .. } => "open_stream",
        }
    }
}

/// A request envelope: who is asking and what for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Caller credentials
    pub credentials: Credentials,
    /// Requested operation
    pub operation: Operation,
}

impl Request {
    /// Build a request.
    #[must_use]
    pub fn new(credentials: Credentials, operation: Operation) -> Self {
        Self { credentials, operation }
    }

    /// Encode as an [`Opcode::Request`] frame.
    pub fn into_frame(&self, request_id: u32) -> Result<Frame> {
        envelope_frame(self, Opcode::Request, request_id)
    }

    /// Decode from an [`Opcode::Request`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        open_envelope(frame, Opcode::Request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn request_frame_carries_request_id() {
        let request = Request::new(
            Credentials::new("alice", "pw"),
            Operation::Reset { id: "abc".to_string() },
        );
        let frame = request.into_frame(7).unwrap();

        assert_eq!(frame.header.request_id(), 7);
        assert_eq!(Request::from_frame(&frame).unwrap(), request);
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let frame = Frame::with_opcode(
            Opcode::Request,
            crate::FrameFlags::fin(),
            bytes::Bytes::from_static(&[0xFF, 0x00, 0x13]),
        );
        assert!(matches!(Request::from_frame(&frame), Err(ProtocolError::CborDecode(_))));
    }
}
