//! CBOR-encoded request/response payloads.
//!
//! Frame headers are raw binary; envelope payloads use CBOR so the schema can
//! grow without breaking older peers. The opcode identifies the envelope type
//! ([`Opcode::Request`] or [`Opcode::Response`]), so only the inner value is
//! serialized.

mod request;
mod response;
mod settings;

use serde::{Serialize, de::DeserializeOwned};

pub use request::{Credentials, Operation, Request};
pub use response::{ErrorPayload, Response};
pub use settings::{MachineSettings, SettingsRequest, WheelSetting};

use crate::{
    Frame, FrameFlags, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

fn encode_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

/// Wrap a CBOR-encoded value into a frame with the given opcode.
fn envelope_frame<T: Serialize>(value: &T, opcode: Opcode, request_id: u32) -> Result<Frame> {
    let payload = encode_cbor(value)?;
    let mut header = FrameHeader::new(opcode);
    header.set_request_id(request_id);
    header.set_flags(FrameFlags::fin());
    Ok(Frame::new(header, payload))
}

/// Decode the CBOR value of a frame after checking its opcode.
fn open_envelope<T: DeserializeOwned>(frame: &Frame, expected: Opcode) -> Result<T> {
    let actual = frame.opcode()?;
    if actual != expected {
        return Err(ProtocolError::UnexpectedOpcode { expected, actual });
    }
    decode_cbor(&frame.payload)
}
