//! Fuzz target for `Frame::decode` and stream frame interpretation.
//!
//! Arbitrary bytes must never panic the parser. Every input is either a
//! valid frame or an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rotorhub_proto::{Frame, StreamFrame};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = Frame::decode(data) {
        assert!(frame.payload.len() == frame.header.payload_size() as usize);
        let _ = StreamFrame::from_frame(frame);
    }
});
