//! Random wheel settings.

use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use rotorhub_proto::{ALPHABET_SIZE, MachineSettings, WheelSetting};

use crate::env::Environment;

/// Produces valid configurations for a given wheel count.
pub trait SettingsGenerator: Send + Sync {
    /// Generate `wheels` random wheels. Every wheel is a permutation of the
    /// alphabet.
    fn generate(&self, wheels: usize) -> MachineSettings;
}

/// Shuffles the identity permutation once per wheel.
///
/// Each call seeds a fresh ChaCha20 stream from the environment, so a seeded
/// environment yields reproducible settings.
#[derive(Debug, Clone)]
pub struct RandomSettingsGenerator<E: Environment> {
    env: E,
}

impl<E: Environment> RandomSettingsGenerator<E> {
    /// Generator drawing entropy from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }
}

impl<E: Environment> SettingsGenerator for RandomSettingsGenerator<E> {
    fn generate(&self, wheels: usize) -> MachineSettings {
        let mut rng = ChaCha20Rng::from_seed(self.env.random_seed());

        let wheel_settings = (0..wheels)
            .map(|_| {
                let mut mappings: Vec<i64> = (0..ALPHABET_SIZE as i64).collect();
                mappings.shuffle(&mut rng);
                WheelSetting::new(mappings)
            })
            .collect::<Vec<_>>();

        MachineSettings::new(wheel_settings)
    }
}
