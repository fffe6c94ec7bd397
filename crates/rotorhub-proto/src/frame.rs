//! Frame type combining header and payload.
//!
//! Layout on the wire: `[FrameHeader: 16 bytes] + [payload: variable bytes]`.
//! A `Frame` holds raw payload bytes; interpretation (CBOR envelope or stream
//! characters) is left to the caller based on the opcode.

use bytes::{BufMut, Bytes};

use crate::{
    FrameFlags, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame.
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`. Enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`] on the
///   wire. Oversized frames are rejected by [`Frame::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// Raw payload bytes
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame, setting the header's payload size from `payload`.
    ///
    /// Payloads above `u32::MAX` are clamped in the header and rejected later
    /// by [`Frame::encode`], which checks the real length.
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        header.payload_size = payload_len.to_be_bytes();

        Self { header, payload }
    }

    /// Shorthand for a frame with the given opcode, flags and payload.
    #[must_use]
    pub fn with_opcode(opcode: Opcode, flags: FrameFlags, payload: impl Into<Bytes>) -> Self {
        let mut header = FrameHeader::new(opcode);
        header.set_flags(flags);
        Self::new(header, payload)
    }

    /// Opcode of this frame.
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownOpcode` if the header carries an undefined value.
    pub fn opcode(&self) -> Result<Opcode> {
        self.header
            .opcode_enum()
            .ok_or(ProtocolError::UnknownOpcode(self.header.opcode()))
    }

    /// Encode frame into buffer.
    ///
    /// # Errors
    ///
    /// `ProtocolError::PayloadTooLarge` if the payload exceeds the limit.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + self.payload.len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode frame from wire format.
    ///
    /// Only `payload_size` bytes after the header are consumed; trailing data
    /// is ignored.
    ///
    /// # Errors
    ///
    /// - Any header validation error from [`FrameHeader::from_bytes`]
    /// - `ProtocolError::FrameTruncated` if the payload is shorter than claimed
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_size = header.payload_size() as usize;

        let payload = bytes
            .get(FrameHeader::SIZE..FrameHeader::SIZE + payload_size)
            .ok_or(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            })?;

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn frame_round_trip(
            payload in prop::collection::vec(any::<u8>(), 0..512),
            request_id in any::<u32>(),
        ) {
            let mut header = FrameHeader::new(Opcode::Binary);
            header.set_request_id(request_id);
            let frame = Frame::new(header, payload);

            let wire = frame.to_vec().unwrap();
            let parsed = Frame::decode(&wire).unwrap();
            prop_assert_eq!(parsed, frame);
        }
    }

    #[test]
    fn new_sets_payload_size() {
        let frame = Frame::new(FrameHeader::new(Opcode::Text), vec![b'A', b'B', b'C']);
        assert_eq!(frame.header.payload_size(), 3);
    }

    #[test]
    fn reject_truncated_frame() {
        let frame = Frame::new(FrameHeader::new(Opcode::Text), vec![0u8; 100]);
        let wire = frame.to_vec().unwrap();

        let result = Frame::decode(&wire[..FrameHeader::SIZE + 10]);
        assert_eq!(result, Err(ProtocolError::FrameTruncated { expected: 100, actual: 10 }));
    }

    #[test]
    fn reject_oversized_encode() {
        let payload = vec![0u8; FrameHeader::MAX_PAYLOAD_SIZE as usize + 1];
        let frame = Frame::new(FrameHeader::new(Opcode::Binary), payload);

        let mut buf = Vec::new();
        assert!(matches!(frame.encode(&mut buf), Err(ProtocolError::PayloadTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_opcode_is_reported() {
        let mut wire = Frame::new(FrameHeader::new(Opcode::Text), Vec::new()).to_vec().unwrap();
        wire[6..8].copy_from_slice(&0x0BADu16.to_be_bytes());

        let frame = Frame::decode(&wire).unwrap();
        assert_eq!(frame.opcode(), Err(ProtocolError::UnknownOpcode(0x0BAD)));
    }
}
