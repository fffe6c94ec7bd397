//! Wire protocol for the rotorhub cipher service.
//!
//! Every message on the wire is a [`Frame`]: a fixed 16-byte binary header
//! followed by a variable-length payload. Two kinds of traffic share the
//! framing:
//!
//! - Request/response envelopes ([`Opcode::Request`], [`Opcode::Response`])
//!   whose payloads are CBOR-encoded [`Request`] and [`Response`] values.
//! - Character stream frames ([`Opcode::Text`], [`Opcode::Binary`],
//!   [`Opcode::Close`]) exchanged once a stream has been accepted. These carry
//!   raw bytes and map onto [`StreamFrame`].
//!
//! This crate performs no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
mod flags;
mod frame;
mod header;
mod opcode;
pub mod payloads;
mod stream;

pub use errors::{ProtocolError, Result};
pub use flags::FrameFlags;
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcode::Opcode;
pub use payloads::{
    Credentials, ErrorPayload, MachineSettings, Operation, Request, Response, SettingsRequest,
    WheelSetting,
};
pub use stream::{MessageKind, StreamFrame};

/// ALPN protocol identifier negotiated during the QUIC handshake.
pub const ALPN_PROTOCOL: &[u8] = b"rotorhub";

/// Number of symbols in the cipher alphabet (A-Z).
pub const ALPHABET_SIZE: usize = 26;
