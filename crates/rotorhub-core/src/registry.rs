//! Session registry.
//!
//! The registry owns the id → session map and arbitrates exclusive access to
//! each session's device. The map lock is held only for insert, lookup and
//! removal, never across device work, so operations on different sessions
//! never wait on each other. Each session carries its own async lock for the
//! device.
//!
//! Exclusive access is granted by [`Session::lock`]. The service calls it on
//! the session it already looked up and authorized;
//! [`SessionRegistry::with_exclusive_access`] is the same primitive keyed by
//! id.
//!
//! Deleted ids are remembered and never handed out again. The retired set
//! grows by one id per delete and is never pruned, so its memory is bounded
//! only by the number of deletes over the process lifetime.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, warn};

use crate::{
    device::Device,
    env::Environment,
    error::CoreError,
    session::{Session, SessionId},
};

/// Attempts at drawing an unused id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Default)]
struct Entries {
    live: HashMap<SessionId, Arc<Session>>,
    retired: HashSet<SessionId>,
}

impl Entries {
    fn is_allocated(&self, id: SessionId) -> bool {
        self.live.contains_key(&id) || self.retired.contains(&id)
    }
}

/// Concurrency-safe store of sessions keyed by id.
pub struct SessionRegistry<E: Environment> {
    env: E,
    entries: RwLock<Entries>,
}

impl<E: Environment> SessionRegistry<E> {
    /// Empty registry drawing ids from `env`.
    pub fn new(env: E) -> Self {
        Self { env, entries: RwLock::new(Entries::default()) }
    }

    /// Environment used for id allocation.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Register `device` under a fresh id owned by `owner`.
    ///
    /// An id collision is retried with a new id, up to [`MAX_ID_ATTEMPTS`].
    ///
    /// # Errors
    ///
    /// `CoreError::Unexpected` if no unused id could be drawn.
    pub fn create(&self, owner: &str, device: Box<dyn Device>) -> Result<SessionId, CoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = SessionId::from_u128(self.env.random_u128());
            if entries.is_allocated(id) {
                debug!(%id, attempt, "session id collision, retrying");
                continue;
            }

            entries.live.insert(id, Arc::new(Session::new(id, owner.to_owned(), device)));
            return Ok(id);
        }

        warn!(attempts = MAX_ID_ATTEMPTS, "session id allocation exhausted");
        Err(CoreError::Unexpected(format!(
            "no unused session id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    /// Look up a live session.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` if no live session has this id.
    pub fn get(&self, id: SessionId) -> Result<Arc<Session>, CoreError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Whether a live session has this id.
    pub fn contains(&self, id: SessionId) -> bool {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).live.contains_key(&id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).live.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a session.
    ///
    /// The entry leaves the map immediately. The call then waits for any
    /// in-flight exclusive section on the device to finish and retires the
    /// device, so no caller that was already waiting can touch it afterwards.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` if the id is unknown or already deleted. Of two
    /// racing deletes, exactly one succeeds.
    pub async fn delete(&self, id: SessionId) -> Result<(), CoreError> {
        let session = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let session =
                entries.live.remove(&id).ok_or_else(|| CoreError::NotFound(id.to_string()))?;
            entries.retired.insert(id);
            session
        };

        session.retire().await;
        Ok(())
    }

    /// Run `f` with exclusive access to the session's device.
    ///
    /// Looks the session up and holds [`Session::lock`] for the duration of
    /// `f`.
    ///
    /// Sections on the same id never overlap; sections on different ids run
    /// independently.
    ///
    /// # Errors
    ///
    /// `CoreError::NotFound` if the session does not exist or is deleted
    /// before access is granted.
    pub async fn with_exclusive_access<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut dyn Device) -> R,
    ) -> Result<R, CoreError> {
        let session = self.get(id)?;
        let mut device = session.lock().await?;
        Ok(f(&mut *device))
    }
}

impl<E: Environment> std::fmt::Debug for SessionRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").field("sessions", &self.len()).finish()
    }
}
