//! Rotor machine device.
//!
//! Each wheel is a permutation applied at its current rotor offset. A letter
//! passes through every wheel in order. Afterwards the first wheel steps one
//! position, and a wheel that completes a revolution carries into the next
//! (odometer stepping). Case is preserved. Characters outside `A-Z`/`a-z`
//! pass through unchanged and leave the rotors where they are.

use rotorhub_proto::{ALPHABET_SIZE, MachineSettings};

use crate::{
    device::{Device, DeviceError},
    validation::{WheelTable, validate_settings},
};

#[derive(Debug, Clone)]
struct Wheel {
    table: WheelTable,
    offset: usize,
}

impl Wheel {
    /// Substitute `index` at the current offset.
    fn substitute(&self, index: usize) -> usize {
        let mapped = self.table.map(index + self.offset);
        (mapped + ALPHABET_SIZE - self.offset) % ALPHABET_SIZE
    }

    /// Advance one position. Returns `true` when the wheel wraps to zero.
    fn step(&mut self) -> bool {
        self.offset = (self.offset + 1) % ALPHABET_SIZE;
        self.offset == 0
    }
}

#[derive(Debug, Clone)]
struct Configured {
    settings: MachineSettings,
    wheels: Vec<Wheel>,
}

/// Multi-wheel substitution cipher with stepping rotors.
#[derive(Debug, Clone, Default)]
pub struct RotorMachine {
    state: Option<Configured>,
}

impl RotorMachine {
    /// Unconfigured machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine configured with `settings`.
    ///
    /// # Errors
    ///
    /// `DeviceError::InvalidSettings` if the settings fail validation.
    pub fn with_settings(settings: MachineSettings) -> Result<Self, DeviceError> {
        let mut machine = Self::new();
        machine.configure(settings)?;
        Ok(machine)
    }

    /// Current rotor offsets, first wheel first. Empty when unconfigured.
    #[must_use]
    pub fn offsets(&self) -> Vec<usize> {
        self.state
            .as_ref()
            .map(|state| state.wheels.iter().map(|w| w.offset).collect())
            .unwrap_or_default()
    }
}

impl Device for RotorMachine {
    fn configure(&mut self, settings: MachineSettings) -> Result<(), DeviceError> {
        let tables = validate_settings(&settings)?;
        let wheels = tables.into_iter().map(|table| Wheel { table, offset: 0 }).collect();
        self.state = Some(Configured { settings, wheels });
        Ok(())
    }

    fn current_settings(&self) -> Option<&MachineSettings> {
        self.state.as_ref().map(|state| &state.settings)
    }

    fn encrypt_char(&mut self, c: char) -> Result<char, DeviceError> {
        let state = self.state.as_mut().ok_or(DeviceError::NotConfigured)?;
        if !c.is_ascii_alphabetic() {
            return Ok(c);
        }

        let base = if c.is_ascii_uppercase() { b'A' } else { b'a' };
        let index = state
            .wheels
            .iter()
            .fold(usize::from(c as u8 - base), |index, wheel| wheel.substitute(index));

        for wheel in &mut state.wheels {
            if !wheel.step() {
                break;
            }
        }

        // index < ALPHABET_SIZE, so the sum stays within ASCII letters
        let out = base + u8::try_from(index).unwrap_or(0);
        Ok(char::from(out))
    }

    fn reset(&mut self) {
        if let Some(state) = self.state.as_mut() {
            for wheel in &mut state.wheels {
                wheel.offset = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rotorhub_proto::WheelSetting;

    use super::*;

    fn machine(wheels: Vec<WheelSetting>) -> RotorMachine {
        RotorMachine::with_settings(MachineSettings::new(wheels)).unwrap()
    }

    #[test]
    fn unconfigured_machine_refuses() {
        let mut machine = RotorMachine::new();
        assert_eq!(machine.encrypt_char('A'), Err(DeviceError::NotConfigured));
        assert_eq!(machine.encrypt_char(' '), Err(DeviceError::NotConfigured));
        assert!(machine.current_settings().is_none());
    }

    #[test]
    fn shift_wheel_is_caesar() {
        let mut machine = machine(vec![WheelSetting::shifted(1)]);
        assert_eq!(machine.encrypt("HELLO").unwrap(), "IFMMP");
    }

    #[test]
    fn case_and_punctuation_preserved() {
        let mut machine = machine(vec![WheelSetting::shifted(1)]);
        assert_eq!(machine.encrypt("Hi, there!").unwrap(), "Ij, uifsf!");
    }

    #[test]
    fn non_letters_do_not_step() {
        let mut machine = machine(vec![WheelSetting::identity(), WheelSetting::identity()]);
        machine.encrypt("a b").unwrap();
        assert_eq!(machine.offsets(), vec![2, 0]);
    }

    #[test]
    fn odometer_carry() {
        let mut machine = machine(vec![WheelSetting::identity(), WheelSetting::identity()]);
        machine.encrypt(&"A".repeat(27)).unwrap();
        assert_eq!(machine.offsets(), vec![1, 1]);
    }

    #[test]
    fn stepping_changes_substitution() {
        let mut mappings: Vec<i64> = (0..26).collect();
        mappings.swap(0, 1);
        let mut machine = machine(vec![WheelSetting::new(mappings)]);

        // At offset 0, A<->B swap. At offset 1 the swap applies to Z<->A.
        assert_eq!(machine.encrypt_char('A').unwrap(), 'B');
        assert_eq!(machine.encrypt_char('A').unwrap(), 'Z');
    }

    #[test]
    fn reset_restores_initial_position() {
        let mut machine = machine(vec![WheelSetting::shifted(5), WheelSetting::shifted(11)]);
        let first = machine.encrypt("ATTACKATDAWN").unwrap();
        machine.reset();
        machine.reset();
        assert_eq!(machine.offsets(), vec![0, 0]);
        assert_eq!(machine.encrypt("ATTACKATDAWN").unwrap(), first);
    }

    #[test]
    fn invalid_configure_keeps_previous_settings() {
        let mut machine = machine(vec![WheelSetting::shifted(1)]);
        machine.encrypt_char('A').unwrap();

        let bad = MachineSettings::new(vec![WheelSetting::new(vec![0; 26])]);
        assert!(matches!(machine.configure(bad), Err(DeviceError::InvalidSettings(_))));
        assert_eq!(
            machine.current_settings(),
            Some(&MachineSettings::new(vec![WheelSetting::shifted(1)]))
        );
        assert_eq!(machine.offsets(), vec![1]);
    }

    #[test]
    fn configure_resets_offsets() {
        let mut machine = machine(vec![WheelSetting::shifted(1)]);
        machine.encrypt("ABC").unwrap();
        machine.configure(MachineSettings::new(vec![WheelSetting::shifted(2)])).unwrap();
        assert_eq!(machine.offsets(), vec![0]);
    }

    fn arbitrary_wheels() -> impl Strategy<Value = Vec<WheelSetting>> {
        prop::collection::vec(
            Just((0..26).collect::<Vec<i64>>()).prop_shuffle().prop_map(WheelSetting::new),
            1..5,
        )
    }

    proptest! {
        /// Property: output has the same length and letter/case shape as input
        #[test]
        fn prop_shape_preserved(wheels in arbitrary_wheels(), text in "[a-zA-Z ,.!]{0,64}") {
            let mut machine = machine(wheels);
            let out = machine.encrypt(&text).unwrap();

            prop_assert_eq!(out.chars().count(), text.chars().count());
            for (a, b) in text.chars().zip(out.chars()) {
                prop_assert_eq!(a.is_ascii_uppercase(), b.is_ascii_uppercase());
                prop_assert_eq!(a.is_ascii_lowercase(), b.is_ascii_lowercase());
                if !a.is_ascii_alphabetic() {
                    prop_assert_eq!(a, b);
                }
            }
        }

        /// Property: after reset, the same input yields the same output
        #[test]
        fn prop_reset_replays(wheels in arbitrary_wheels(), text in "[A-Z]{1,80}") {
            let mut machine = machine(wheels);
            let first = machine.encrypt(&text).unwrap();
            machine.reset();
            prop_assert_eq!(machine.encrypt(&text).unwrap(), first);
        }
    }
}
