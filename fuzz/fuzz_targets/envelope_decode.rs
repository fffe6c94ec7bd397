//! Fuzz target for CBOR request/response envelopes.
//!
//! Payload bytes under a valid header, with either envelope opcode. Decoding
//! must return an error for anything malformed and never panic. A request
//! that does decode must survive re-encoding.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rotorhub_proto::{Frame, FrameFlags, Opcode, Request, Response};

#[derive(Debug, Arbitrary)]
struct Input {
    as_request: bool,
    request_id: u32,
    payload: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let opcode = if input.as_request { Opcode::Request } else { Opcode::Response };
    let mut frame = Frame::with_opcode(opcode, FrameFlags::fin(), input.payload);
    frame.header.set_request_id(input.request_id);

    if input.as_request {
        if let Ok(request) = Request::from_frame(&frame) {
            let again = request.into_frame(input.request_id).expect("re-encode");
            assert_eq!(Request::from_frame(&again).expect("re-decode"), request);
        }
    } else {
        let _ = Response::from_frame(&frame);
    }
});
