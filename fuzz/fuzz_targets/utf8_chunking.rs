//! Fuzz target for the incremental UTF-8 decoder.
//!
//! However valid text is split into chunks, the decoder must yield exactly
//! its characters.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rotorhub_core::Utf8Decoder;

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    cuts: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let bytes = input.text.as_bytes();
    let mut decoder = Utf8Decoder::default();
    let mut decoded = Vec::new();

    let mut start = 0;
    for cut in input.cuts {
        let end = (start + usize::from(cut)).min(bytes.len());
        decoded.extend(decoder.decode(&bytes[start..end]));
        start = end;
    }
    decoded.extend(decoder.decode(&bytes[start..]));

    assert_eq!(decoded, input.text.chars().collect::<Vec<_>>());
    assert_eq!(decoder.pending(), 0);
});
