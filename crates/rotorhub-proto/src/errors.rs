//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while parsing or building frames and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than the fixed header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Header does not start with the protocol magic.
    #[error("invalid magic number")]
    InvalidMagic,

    /// Header carries a version this build does not speak.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds [`crate::FrameHeader::MAX_PAYLOAD_SIZE`].
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Claimed or actual payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Fewer payload bytes than the header claims.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload bytes claimed by the header
        expected: usize,
        /// Payload bytes present
        actual: usize,
    },

    /// Opcode is not one this protocol defines.
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u16),

    /// Frame has a valid opcode but not the one the caller expected.
    #[error("unexpected opcode: expected {expected:?}, got {actual:?}")]
    UnexpectedOpcode {
        /// Opcode the caller expected
        expected: crate::Opcode,
        /// Opcode found in the header
        actual: crate::Opcode,
    },

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}
