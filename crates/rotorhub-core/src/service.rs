//! Session service.
//!
//! Transport-neutral implementation of every caller-facing operation. Each
//! operation runs its checks in a fixed order: request validation, caller
//! identity, registry lookup and access control, then device work under the
//! session's exclusive lock. A failure at any step leaves the registry and
//! every device untouched.

use std::sync::Arc;

use rotorhub_proto::{MachineSettings, SettingsRequest};
use tracing::{info, warn};

use crate::{
    access::{Access, ExistencePolicy, Identity, authorize},
    device::{DeviceFactory, RotorMachineFactory},
    env::Environment,
    error::{CoreError, ForbiddenReason},
    generator::{RandomSettingsGenerator, SettingsGenerator},
    registry::SessionRegistry,
    session::{Session, SessionId},
    stream::StreamTicket,
    validation::{DEFAULT_MAX_WHEELS, SettingsSource, validate_plaintext},
};

/// Service tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Upper bound on randomly generated wheels per request
    pub max_wheels: usize,
    /// How denials are reported to non-owners
    pub existence_policy: ExistencePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { max_wheels: DEFAULT_MAX_WHEELS, existence_policy: ExistencePolicy::Disclose }
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    /// New session id
    pub id: SessionId,
    /// Settings applied to the new device
    pub settings: MachineSettings,
}

/// Caller-facing session operations.
pub struct SessionService<E: Environment> {
    registry: SessionRegistry<E>,
    generator: Arc<dyn SettingsGenerator>,
    factory: Arc<dyn DeviceFactory>,
    config: ServiceConfig,
}

impl<E: Environment> SessionService<E> {
    /// Service with rotor machine devices and random settings drawn from
    /// `env`.
    pub fn new(env: E, config: ServiceConfig) -> Self {
        let generator = Arc::new(RandomSettingsGenerator::new(env.clone()));
        Self::with_parts(env, config, generator, Arc::new(RotorMachineFactory))
    }

    /// Service with custom collaborators.
    pub fn with_parts(
        env: E,
        config: ServiceConfig,
        generator: Arc<dyn SettingsGenerator>,
        factory: Arc<dyn DeviceFactory>,
    ) -> Self {
        Self { registry: SessionRegistry::new(env), generator, factory, config }
    }

    /// Underlying registry.
    pub fn registry(&self) -> &SessionRegistry<E> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    /// Create a session owned by `caller`.
    ///
    /// # Errors
    ///
    /// - `InvalidSettings` for a malformed settings request
    /// - `Forbidden` if the caller is unresolved
    /// - `Unexpected` if id allocation fails
    pub async fn create(
        &self,
        caller: Option<&Identity>,
        request: SettingsRequest,
    ) -> Result<Created, CoreError> {
        let source = SettingsSource::from_request(request, self.config.max_wheels)
            .inspect_err(|e| warn!(error = %e, "create rejected: invalid settings"))?;
        let owner = require_identity(caller)?;

        let settings = self.resolve(source);
        let device = self.factory.build(settings.clone())?;
        let id = self.registry.create(owner.as_str(), device)?;

        info!(%id, %owner, wheels = settings.wheel_count(), "created session");
        Ok(Created { id, settings })
    }

    /// Encrypt `plaintext`, advancing the device's rotors.
    ///
    /// # Errors
    ///
    /// - `InvalidPlaintext` for empty text or characters other than letters
    ///   and whitespace
    /// - `Forbidden` / `NotFound` from the session lookup
    /// - `Conflict` if the device is not configured
    pub async fn encrypt(
        &self,
        caller: Option<&Identity>,
        id: &str,
        plaintext: &str,
    ) -> Result<String, CoreError> {
        validate_plaintext(plaintext)
            .inspect_err(|e| warn!(id, error = %e, "encrypt rejected: invalid plaintext"))?;
        let session = self.lookup(caller, id)?;

        let ciphertext = session.lock().await?.encrypt(plaintext)?;

        info!(session_id = %session.id(), chars = plaintext.chars().count(), "encrypted");
        Ok(ciphertext)
    }

    /// Replace the device configuration wholesale.
    ///
    /// The rotors return to the initial position. On failure the previous
    /// configuration is kept.
    ///
    /// # Errors
    ///
    /// - `InvalidSettings` for a malformed settings request
    /// - `Forbidden` / `NotFound` from the session lookup
    pub async fn update_settings(
        &self,
        caller: Option<&Identity>,
        id: &str,
        request: SettingsRequest,
    ) -> Result<MachineSettings, CoreError> {
        let source = SettingsSource::from_request(request, self.config.max_wheels)
            .inspect_err(|e| warn!(id, error = %e, "update rejected: invalid settings"))?;
        let session = self.lookup(caller, id)?;

        let settings = self.resolve(source);
        session.lock().await?.configure(settings.clone())?;

        info!(session_id = %session.id(), wheels = settings.wheel_count(), "updated settings");
        Ok(settings)
    }

    /// Current device configuration.
    ///
    /// # Errors
    ///
    /// - `Forbidden` / `NotFound` from the session lookup
    /// - `Conflict` if the device is not configured
    pub async fn get_settings(
        &self,
        caller: Option<&Identity>,
        id: &str,
    ) -> Result<MachineSettings, CoreError> {
        let session = self.lookup(caller, id)?;
        let device = session.lock().await?;
        device.current_settings().cloned().ok_or_else(CoreError::not_configured)
    }

    /// Return the device's rotors to the initial position.
    ///
    /// # Errors
    ///
    /// `Forbidden` / `NotFound` from the session lookup.
    pub async fn reset(&self, caller: Option<&Identity>, id: &str) -> Result<(), CoreError> {
        let session = self.lookup(caller, id)?;
        session.lock().await?.reset();

        info!(session_id = %session.id(), "reset");
        Ok(())
    }

    /// Delete the session.
    ///
    /// # Errors
    ///
    /// `Forbidden` / `NotFound` from the session lookup, or `NotFound` if a
    /// concurrent delete won.
    pub async fn delete(&self, caller: Option<&Identity>, id: &str) -> Result<(), CoreError> {
        let session = self.lookup(caller, id)?;
        self.registry.delete(session.id()).await?;

        info!(session_id = %session.id(), "deleted session");
        Ok(())
    }

    /// Authorize a character stream against a session.
    ///
    /// `preconfigure`, when present, is applied as a settings update before
    /// the stream is accepted.
    ///
    /// # Errors
    ///
    /// - `InvalidSettings` for a malformed `preconfigure` request
    /// - `Forbidden` / `NotFound` from the session lookup
    /// - `Conflict` if the device is still unconfigured
    pub async fn open_stream(
        &self,
        caller: Option<&Identity>,
        id: &str,
        preconfigure: Option<SettingsRequest>,
    ) -> Result<StreamTicket, CoreError> {
        let source = preconfigure
            .map(|request| SettingsSource::from_request(request, self.config.max_wheels))
            .transpose()
            .inspect_err(|e| warn!(id, error = %e, "stream rejected: invalid settings"))?;
        let session = self.lookup(caller, id)?;

        {
            let mut device = session.lock().await?;
            if let Some(source) = source {
                device.configure(self.resolve(source))?;
            }
            if device.current_settings().is_none() {
                warn!(session_id = %session.id(), "stream rejected: device not configured");
                return Err(CoreError::not_configured());
            }
        }

        info!(session_id = %session.id(), "stream accepted");
        Ok(StreamTicket::new(session))
    }

    fn resolve(&self, source: SettingsSource) -> MachineSettings {
        match source {
            SettingsSource::Random { wheels } => self.generator.generate(wheels),
            SettingsSource::Explicit(settings) => settings,
        }
    }

    /// Resolve the caller, find the session and check ownership.
    fn lookup(&self, caller: Option<&Identity>, id: &str) -> Result<Arc<Session>, CoreError> {
        let caller = require_identity(caller)?;

        let session_id = id.parse::<SessionId>().map_err(|_| CoreError::NotFound(id.to_owned()))?;
        let session = self
            .registry
            .get(session_id)
            .inspect_err(|_| warn!(id, "session not found"))?;

        match authorize(Some(caller), &session) {
            Access::Allowed => Ok(session),
            Access::Denied => {
                warn!(session_id = %session_id, caller = %caller, "access denied");
                Err(self.config.existence_policy.denial(&session))
            },
        }
    }
}

impl<E: Environment> std::fmt::Debug for SessionService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn require_identity(caller: Option<&Identity>) -> Result<&Identity, CoreError> {
    caller.ok_or_else(|| {
        warn!("rejected unauthenticated caller");
        CoreError::Forbidden(ForbiddenReason::Unauthenticated)
    })
}
