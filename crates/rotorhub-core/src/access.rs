//! Ownership-based access control.
//!
//! A caller may act on a session only if its resolved identity equals the
//! session owner. The check is pure and recomputed on every request.

use std::fmt;

use crate::{
    error::{CoreError, ForbiddenReason},
    session::Session,
};

/// A resolved, non-empty caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Identity from a principal name. `None` for an empty name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (!name.is_empty()).then_some(Self(name))
    }

    /// Principal name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Caller owns the session
    Allowed,
    /// Caller is unresolved or not the owner
    Denied,
}

/// Decide whether `caller` may observe or mutate `session`.
pub fn authorize(caller: Option<&Identity>, session: &Session) -> Access {
    match caller {
        Some(identity) if identity.as_str() == session.owner() => Access::Allowed,
        _ => Access::Denied,
    }
}

/// How a denial is reported to a non-owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistencePolicy {
    /// Report `Forbidden`, revealing that the session exists
    #[default]
    Disclose,
    /// Report `NotFound`, indistinguishable from an unknown id
    Conceal,
}

impl ExistencePolicy {
    /// Error for a caller denied access to `session`.
    pub fn denial(self, session: &Session) -> CoreError {
        match self {
            Self::Disclose => CoreError::Forbidden(ForbiddenReason::NotOwner),
            Self::Conceal => CoreError::NotFound(session.id().to_string()),
        }
    }
}
