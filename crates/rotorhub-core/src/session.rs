//! Sessions: one device bound to one owner under one id.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    str::FromStr,
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{device::Device, error::CoreError};

/// Opaque 128-bit session identifier.
///
/// Rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u128);

impl SessionId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw id value.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Id text that is not 32 hex digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSessionId;

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidSessionId);
        }
        u128::from_str_radix(s, 16).map(Self).map_err(|_| InvalidSessionId)
    }
}

pub(crate) struct DeviceSlot {
    pub(crate) device: Box<dyn Device>,
    /// Set once the session has been deleted. A retired slot is never
    /// handed out again.
    pub(crate) retired: bool,
}

/// A registered session.
///
/// The device is reachable only through [`Session::lock`], which grants
/// exclusive access for the lifetime of the returned guard.
pub struct Session {
    id: SessionId,
    owner: String,
    device: Arc<Mutex<DeviceSlot>>,
}

impl Session {
    pub(crate) fn new(id: SessionId, owner: String, device: Box<dyn Device>) -> Self {
        Self { id, owner, device: Arc::new(Mutex::new(DeviceSlot { device, retired: false })) }
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Owning identity.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Wait for exclusive access to the device.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` if the session was deleted, including while
    /// this call was waiting.
    pub async fn lock(&self) -> Result<DeviceGuard, CoreError> {
        let slot = Arc::clone(&self.device).lock_owned().await;
        if slot.retired {
            return Err(CoreError::NotFound(self.id.to_string()));
        }
        Ok(DeviceGuard { slot })
    }

    /// Exclusive access without waiting.
    ///
    /// `None` if another section currently holds the device.
    pub(crate) fn try_lock(&self) -> Option<Result<DeviceGuard, CoreError>> {
        let slot = Arc::clone(&self.device).try_lock_owned().ok()?;
        if slot.retired {
            return Some(Err(CoreError::NotFound(self.id.to_string())));
        }
        Some(Ok(DeviceGuard { slot }))
    }

    /// Mark retired. Waits for any in-flight exclusive section to finish.
    pub(crate) async fn retire(&self) {
        self.device.lock().await.retired = true;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).field("owner", &self.owner).finish()
    }
}

/// Exclusive access to a session's device. Released on drop.
pub struct DeviceGuard {
    slot: OwnedMutexGuard<DeviceSlot>,
}

impl Deref for DeviceGuard {
    type Target = dyn Device;

    fn deref(&self) -> &Self::Target {
        self.slot.device.as_ref()
    }
}

impl DerefMut for DeviceGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.slot.device.as_mut()
    }
}
