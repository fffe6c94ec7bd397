//! Wheel settings as exchanged on the wire.
//!
//! These are plain data carriers. Validity (26 distinct symbols per wheel,
//! mutual exclusivity of random and explicit settings) is enforced by the
//! service layer, so mappings are signed integers here and out-of-range
//! values survive decoding long enough to be rejected with a precise error.

use serde::{Deserialize, Serialize};

/// One wheel: `mappings[i]` is the symbol that input symbol `i` maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WheelSetting {
    /// Substitution table, expected to be a permutation of `0..26`
    pub mappings: Vec<i64>,
}

impl WheelSetting {
    /// Wheel from a mapping table.
    pub fn new(mappings: impl Into<Vec<i64>>) -> Self {
        Self { mappings: mappings.into() }
    }

    /// Identity wheel (every symbol maps to itself).
    #[must_use]
    pub fn identity() -> Self {
        Self { mappings: (0..crate::ALPHABET_SIZE as i64).collect() }
    }

    /// Wheel that shifts every symbol forward by `shift` positions.
    #[must_use]
    pub fn shifted(shift: i64) -> Self {
        let size = crate::ALPHABET_SIZE as i64;
        Self { mappings: (0..size).map(|i| (i + shift).rem_euclid(size)).collect() }
    }
}

/// Full device configuration: an ordered sequence of wheels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MachineSettings {
    /// Wheels in signal order
    pub wheel_settings: Vec<WheelSetting>,
}

impl MachineSettings {
    /// Settings from a list of wheels.
    pub fn new(wheel_settings: impl Into<Vec<WheelSetting>>) -> Self {
        Self { wheel_settings: wheel_settings.into() }
    }

    /// Number of wheels.
    #[must_use]
    pub fn wheel_count(&self) -> usize {
        self.wheel_settings.len()
    }
}

/// Settings as requested by a caller on create or update.
///
/// Either `use_random_wheels` with a positive `number_of_wheels`, or explicit
/// `machine_settings`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsRequest {
    /// Ask the server to generate random wheels
    #[serde(default)]
    pub use_random_wheels: bool,
    /// Wheel count for random generation
    #[serde(default)]
    pub number_of_wheels: i64,
    /// Caller-supplied wheels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_settings: Option<MachineSettings>,
}

impl SettingsRequest {
    /// Request `count` randomly generated wheels.
    #[must_use]
    pub fn random(count: i64) -> Self {
        Self { use_random_wheels: true, number_of_wheels: count, machine_settings: None }
    }

    /// Request explicit wheels.
    #[must_use]
    pub fn explicit(settings: MachineSettings) -> Self {
        Self { use_random_wheels: false, number_of_wheels: 0, machine_settings: Some(settings) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_wheel_wraps() {
        let wheel = WheelSetting::shifted(3);
        assert_eq!(wheel.mappings[0], 3);
        assert_eq!(wheel.mappings[25], 2);
    }

    #[test]
    fn negative_shift_wraps() {
        let wheel = WheelSetting::shifted(-1);
        assert_eq!(wheel.mappings[0], 25);
        assert_eq!(wheel.mappings[1], 0);
    }
}
