//! Character stream frames.
//!
//! Once a stream is accepted, both peers exchange [`StreamFrame`]s. Data frames
//! carry raw bytes tagged with a message kind and the FIN (final fragment)
//! flag. A close frame ends the stream.

use bytes::Bytes;

use crate::{
    Frame, FrameFlags, Opcode,
    errors::{ProtocolError, Result},
};

/// Message type of a data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// UTF-8 text
    Text,
    /// Opaque bytes
    Binary,
}

impl MessageKind {
    const fn opcode(self) -> Opcode {
        match self {
            Self::Text => Opcode::Text,
            Self::Binary => Opcode::Binary,
        }
    }
}

/// A frame on an accepted character stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Data frame.
    Data {
        /// Message type, echoed on replies
        kind: MessageKind,
        /// Final-fragment flag, echoed on replies
        fin: bool,
        /// Raw bytes
        payload: Bytes,
    },
    /// Close signal. Terminates the stream.
    Close,
}

impl StreamFrame {
    /// Final text fragment carrying `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Data { kind: MessageKind::Text, fin: true, payload: Bytes::from(text.into()) }
    }

    /// Final binary fragment carrying `bytes`.
    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::Data { kind: MessageKind::Binary, fin: true, payload: bytes.into() }
    }

    /// Whether this is the close signal.
    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close)
    }

    /// Convert into a wire frame.
    #[must_use]
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Data { kind, fin, payload } => {
                Frame::with_opcode(kind.opcode(), FrameFlags::empty().with_fin(fin), payload)
            },
            Self::Close => Frame::with_opcode(Opcode::Close, FrameFlags::fin(), Bytes::new()),
        }
    }

    /// Interpret a wire frame as a stream frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` for undefined opcodes
    /// - `ProtocolError::UnexpectedOpcode` for request/response opcodes
    pub fn from_frame(frame: Frame) -> Result<Self> {
        let fin = frame.header.flags().is_fin();
        match frame.opcode()? {
            Opcode::Text => Ok(Self::Data { kind: MessageKind::Text, fin, payload: frame.payload }),
            Opcode::Binary => {
                Ok(Self::Data { kind: MessageKind::Binary, fin, payload: frame.payload })
            },
            Opcode::Close => Ok(Self::Close),
            other => Err(ProtocolError::UnexpectedOpcode { expected: Opcode::Text, actual: other }),
        }
    }
}
