//! Caller identity resolution.
//!
//! Every request carries username/password credentials. An
//! [`IdentityProvider`] turns them into an [`Identity`], or `None` when they
//! do not check out. Unresolved callers are rejected by the session service.

use std::{collections::HashMap, fmt};

use rotorhub_core::Identity;
use rotorhub_proto::Credentials;
use subtle::ConstantTimeEq;

use crate::error::ServerError;

/// Resolves request credentials to a caller identity.
pub trait IdentityProvider: Send + Sync {
    /// Identity for `credentials`, or `None` if they are not valid.
    fn resolve(&self, credentials: &Credentials) -> Option<Identity>;
}

/// Static username/password table.
#[derive(Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Empty store. Resolves nobody.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    ///
    /// # Errors
    ///
    /// `ServerError::Config` for an empty username.
    pub fn insert(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), ServerError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ServerError::Config("username must not be empty".to_string()));
        }
        self.users.insert(username, password.into());
        Ok(())
    }

    /// Parse `NAME:PASSWORD` entries. The password may itself contain `:`.
    ///
    /// # Errors
    ///
    /// `ServerError::Config` for an entry without `:` or with an empty name.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self, ServerError> {
        let mut store = Self::new();
        for spec in specs {
            let spec = spec.as_ref();
            let (username, password) = spec.split_once(':').ok_or_else(|| {
                ServerError::Config("user entries must look like NAME:PASSWORD".to_string())
            })?;
            store.insert(username, password)?;
        }
        Ok(store)
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityProvider for CredentialStore {
    fn resolve(&self, credentials: &Credentials) -> Option<Identity> {
        let expected = self.users.get(&credentials.username)?;
        if expected.as_bytes().ct_eq(credentials.password.as_bytes()).into() {
            Identity::new(credentials.username.clone())
        } else {
            None
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.users.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CredentialStore").field("users", &names).finish()
    }
}
