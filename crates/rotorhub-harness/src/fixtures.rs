//! Session fixtures shared by integration tests.

use std::sync::Arc;

use rotorhub_core::{
    Device, DeviceError, DeviceFactory, Identity, RotorMachine, ServiceConfig, SessionService,
};
use rotorhub_proto::{MachineSettings, SettingsRequest, WheelSetting};

use crate::SimEnv;

/// Identity for `name`. Panics on an empty name.
#[allow(clippy::expect_used)]
pub fn identity(name: &str) -> Identity {
    Identity::new(name).expect("fixture identities are non-empty")
}

/// Settings with one shifted wheel per entry.
pub fn shift_settings(shifts: &[i64]) -> MachineSettings {
    MachineSettings::new(shifts.iter().map(|&s| WheelSetting::shifted(s)).collect::<Vec<_>>())
}

/// Explicit settings request with shifted wheels.
pub fn shift_request(shifts: &[i64]) -> SettingsRequest {
    SettingsRequest::explicit(shift_settings(shifts))
}

/// Service over a seeded [`SimEnv`] with default configuration.
pub fn service(seed: u64) -> SessionService<SimEnv> {
    SessionService::new(SimEnv::with_seed(seed), ServiceConfig::default())
}

/// Service over a seeded [`SimEnv`] building [`FaultyDevice`]s.
pub fn faulty_service(seed: u64, fault_after: usize) -> SessionService<SimEnv> {
    let env = SimEnv::with_seed(seed);
    let generator = Arc::new(rotorhub_core::RandomSettingsGenerator::new(env.clone()));
    SessionService::with_parts(
        env,
        ServiceConfig::default(),
        generator,
        Arc::new(FaultyFactory { fault_after }),
    )
}

/// Rotor machine that faults once it has encrypted a fixed number of
/// characters since the last reset.
#[derive(Debug)]
pub struct FaultyDevice {
    inner: RotorMachine,
    fault_after: usize,
    used: usize,
}

impl Device for FaultyDevice {
    fn configure(&mut self, settings: MachineSettings) -> Result<(), DeviceError> {
        self.inner.configure(settings)
    }

    fn current_settings(&self) -> Option<&MachineSettings> {
        self.inner.current_settings()
    }

    fn encrypt_char(&mut self, c: char) -> Result<char, DeviceError> {
        if self.used >= self.fault_after {
            return Err(DeviceError::Faulted(format!("jammed after {} characters", self.used)));
        }
        self.used += 1;
        self.inner.encrypt_char(c)
    }

    fn reset(&mut self) {
        self.used = 0;
        self.inner.reset();
    }
}

/// Factory for [`FaultyDevice`]s.
#[derive(Debug, Clone, Copy)]
pub struct FaultyFactory {
    /// Characters each device encrypts before faulting
    pub fault_after: usize,
}

impl DeviceFactory for FaultyFactory {
    fn build(&self, settings: MachineSettings) -> Result<Box<dyn Device>, DeviceError> {
        Ok(Box::new(FaultyDevice {
            inner: RotorMachine::with_settings(settings)?,
            fault_after: self.fault_after,
            used: 0,
        }))
    }
}
