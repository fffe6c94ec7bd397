//! Input validation for wheel settings and plaintext.
//!
//! Validation parses wire settings into [`WheelTable`]s so the device never
//! sees an unchecked mapping. Everything here runs before the registry is
//! touched.

use rotorhub_proto::{ALPHABET_SIZE, MachineSettings, SettingsRequest};
use thiserror::Error;

/// Default upper bound on randomly generated wheels.
pub const DEFAULT_MAX_WHEELS: usize = 64;

/// Rejected wheel settings or settings request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Settings contain no wheels
    #[error("at least one wheel is required")]
    NoWheels,

    /// A wheel does not have exactly one entry per symbol
    #[error("wheel {wheel} has {len} mappings, expected 26")]
    WrongLength {
        /// Wheel index
        wheel: usize,
        /// Number of mappings supplied
        len: usize,
    },

    /// A mapping value is not a symbol index
    #[error("wheel {wheel} maps to {value}, outside 0..=25")]
    OutOfRange {
        /// Wheel index
        wheel: usize,
        /// Offending value
        value: i64,
    },

    /// A mapping value appears twice, so the wheel is not a permutation
    #[error("wheel {wheel} maps to {value} more than once")]
    Duplicate {
        /// Wheel index
        wheel: usize,
        /// Repeated value
        value: i64,
    },

    /// Random generation and explicit settings were both requested
    #[error("random wheels and explicit settings are mutually exclusive")]
    Ambiguous,

    /// Neither random generation nor explicit settings were requested
    #[error("either random wheels or explicit settings are required")]
    Missing,

    /// Random wheel count outside `1..=max`
    #[error("random wheel count must be between 1 and {max}, got {requested}")]
    WheelCount {
        /// Requested count
        requested: i64,
        /// Configured upper bound
        max: usize,
    },
}

/// Rejected plaintext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaintextError {
    /// Nothing to encrypt
    #[error("plaintext must not be empty")]
    Empty,

    /// Character that is neither alphabetic nor whitespace
    #[error("plaintext may only contain letters and whitespace, found {ch:?} at {position}")]
    InvalidChar {
        /// Offending character
        ch: char,
        /// Character index
        position: usize,
    },
}

/// A validated wheel: a permutation of the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelTable([u8; ALPHABET_SIZE]);

impl WheelTable {
    /// Symbol that `index` maps to.
    #[must_use]
    pub fn map(&self, index: usize) -> usize {
        usize::from(self.0[index % ALPHABET_SIZE])
    }
}

/// Validate explicit settings and parse them into wheel tables.
///
/// # Errors
///
/// The first violation found, in wheel order.
pub fn validate_settings(settings: &MachineSettings) -> Result<Vec<WheelTable>, SettingsError> {
    if settings.wheel_settings.is_empty() {
        return Err(SettingsError::NoWheels);
    }

    settings
        .wheel_settings
        .iter()
        .enumerate()
        .map(|(wheel, setting)| {
            if setting.mappings.len() != ALPHABET_SIZE {
                return Err(SettingsError::WrongLength { wheel, len: setting.mappings.len() });
            }

            let mut table = [0u8; ALPHABET_SIZE];
            let mut seen = [false; ALPHABET_SIZE];
            for (slot, &value) in table.iter_mut().zip(&setting.mappings) {
                let symbol = u8::try_from(value)
                    .ok()
                    .filter(|&s| usize::from(s) < ALPHABET_SIZE)
                    .ok_or(SettingsError::OutOfRange { wheel, value })?;

                if std::mem::replace(&mut seen[usize::from(symbol)], true) {
                    return Err(SettingsError::Duplicate { wheel, value });
                }
                *slot = symbol;
            }

            Ok(WheelTable(table))
        })
        .collect()
}

/// Check plaintext for the encrypt operation.
///
/// # Errors
///
/// `PlaintextError::Empty` for an empty string, otherwise the first
/// character that is neither alphabetic nor whitespace.
pub fn validate_plaintext(plaintext: &str) -> Result<(), PlaintextError> {
    if plaintext.is_empty() {
        return Err(PlaintextError::Empty);
    }

    match plaintext.chars().enumerate().find(|(_, c)| !c.is_alphabetic() && !c.is_whitespace()) {
        Some((position, ch)) => Err(PlaintextError::InvalidChar { ch, position }),
        None => Ok(()),
    }
}

/// Where new settings come from, after shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Generate this many random wheels
    Random {
        /// Wheel count, within `1..=max_wheels`
        wheels: usize,
    },
    /// Apply these validated settings
    Explicit(MachineSettings),
}

impl SettingsSource {
    /// Interpret a settings request.
    ///
    /// Explicit settings are fully validated here so that nothing invalid
    /// reaches a device.
    ///
    /// # Errors
    ///
    /// - `SettingsError::Ambiguous` if both random and explicit are requested
    /// - `SettingsError::Missing` if neither is requested
    /// - `SettingsError::WheelCount` if the random count is outside
    ///   `1..=max_wheels`
    /// - Any error from [`validate_settings`]
    pub fn from_request(
        request: SettingsRequest,
        max_wheels: usize,
    ) -> Result<Self, SettingsError> {
        match (request.use_random_wheels, request.machine_settings) {
            (true, Some(_)) => Err(SettingsError::Ambiguous),
            (false, None) => Err(SettingsError::Missing),
            (true, None) => {
                let requested = request.number_of_wheels;
                usize::try_from(requested)
                    .ok()
                    .filter(|count| (1..=max_wheels).contains(count))
                    .map(|wheels| Self::Random { wheels })
                    .ok_or(SettingsError::WheelCount { requested, max: max_wheels })
            },
            (false, Some(settings)) => {
                validate_settings(&settings)?;
                Ok(Self::Explicit(settings))
            },
        }
    }
}
