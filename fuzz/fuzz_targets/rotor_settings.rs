//! Fuzz target for wheel settings validation and the rotor machine.
//!
//! # Invariants
//!
//! - Validation never panics on arbitrary mappings
//! - A machine built from accepted settings preserves text shape
//! - Reset replays the same ciphertext

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rotorhub_core::{Device, RotorMachine, validate_settings};
use rotorhub_proto::{MachineSettings, WheelSetting};

#[derive(Debug, Arbitrary)]
struct Input {
    wheels: Vec<Vec<i64>>,
    text: String,
}

fuzz_target!(|input: Input| {
    let settings = MachineSettings::new(
        input.wheels.into_iter().take(8).map(WheelSetting::new).collect::<Vec<_>>(),
    );
    if validate_settings(&settings).is_err() {
        return;
    }

    let mut machine = RotorMachine::with_settings(settings).expect("validated settings");
    let first = machine.encrypt(&input.text).expect("configured");
    assert_eq!(first.chars().count(), input.text.chars().count());

    machine.reset();
    assert_eq!(machine.encrypt(&input.text).expect("configured"), first);
});
