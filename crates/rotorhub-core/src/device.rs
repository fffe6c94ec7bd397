//! Device abstraction.
//!
//! A device is a stateful cipher engine. Its configuration (wheel settings)
//! is replaced wholesale; its progress state (rotor positions) advances with
//! every letter encrypted and returns to the initial position on reset.
//!
//! Devices are not safe for concurrent mutation. The registry owns each
//! device behind a per-session lock and never hands out a raw handle.

use rotorhub_proto::MachineSettings;
use thiserror::Error;

use crate::validation::SettingsError;

/// Errors reported by a device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Operation requires wheel settings but none have been applied
    #[error("device is not configured")]
    NotConfigured,

    /// Settings were rejected; the previous configuration is kept
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// Engine-specific failure
    #[error("device fault: {0}")]
    Faulted(String),
}

/// A stateful character transformation engine.
pub trait Device: Send + Sync {
    /// Replace the configuration and return rotors to the initial position.
    ///
    /// Invalid settings are rejected without touching the current state.
    fn configure(&mut self, settings: MachineSettings) -> Result<(), DeviceError>;

    /// Current configuration. `None` until first configured.
    fn current_settings(&self) -> Option<&MachineSettings>;

    /// Transform one character, advancing rotor state for letters.
    fn encrypt_char(&mut self, c: char) -> Result<char, DeviceError>;

    /// Transform a string one character at a time.
    fn encrypt(&mut self, text: &str) -> Result<String, DeviceError> {
        text.chars().map(|c| self.encrypt_char(c)).collect()
    }

    /// Return rotors to the initial position. Configuration is unchanged.
    fn reset(&mut self);
}

/// Builds devices for new sessions.
pub trait DeviceFactory: Send + Sync {
    /// Build a device configured with `settings`.
    fn build(&self, settings: MachineSettings) -> Result<Box<dyn Device>, DeviceError>;
}

/// Factory for [`crate::RotorMachine`] devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotorMachineFactory;

impl DeviceFactory for RotorMachineFactory {
    fn build(&self, settings: MachineSettings) -> Result<Box<dyn Device>, DeviceError> {
        Ok(Box::new(crate::RotorMachine::with_settings(settings)?))
    }
}
