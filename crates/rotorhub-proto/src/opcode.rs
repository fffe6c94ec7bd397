//! Frame operation codes.

/// Operation code carried in every frame header.
///
/// Request/response opcodes carry CBOR envelopes. Stream opcodes carry raw
/// character bytes and are only valid after a stream has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// CBOR-encoded [`crate::Request`]
    Request = 0x0001,
    /// CBOR-encoded [`crate::Response`]
    Response = 0x0002,
    /// Stream data, text message type
    Text = 0x0010,
    /// Stream data, binary message type
    Binary = 0x0011,
    /// Stream close signal
    Close = 0x0012,
}

impl Opcode {
    /// Raw wire value.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a raw wire value. `None` if unrecognized.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Request),
            0x0002 => Some(Self::Response),
            0x0010 => Some(Self::Text),
            0x0011 => Some(Self::Binary),
            0x0012 => Some(Self::Close),
            _ => None,
        }
    }

    /// Whether this opcode belongs to the character stream.
    #[must_use]
    pub const fn is_stream(self) -> bool {
        matches!(self, Self::Text | Self::Binary | Self::Close)
    }
}
