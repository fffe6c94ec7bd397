//! Session core for rotorhub.
//!
//! Holds stateful rotor cipher devices in sessions owned by one identity
//! each, and exposes the operations callers perform on them.
//!
//! # Layers
//!
//! - [`Device`] and [`RotorMachine`]: the cipher engine
//! - [`validation`] and [`SettingsGenerator`]: what may be applied to a device
//! - [`SessionRegistry`]: id → session map with per-session exclusive access
//! - [`authorize`]: ownership check, recomputed on every request
//! - [`SessionService`]: caller-facing operations in a fixed check order
//! - [`run_stream`]: character-by-character encryption over a
//!   [`FrameTransport`]
//!
//! Nothing here performs network I/O or reads the clock directly. Time and
//! randomness come from an [`Environment`], so a seeded environment makes
//! every scenario reproducible.

pub mod access;
pub mod device;
pub mod env;
pub mod error;
pub mod generator;
pub mod registry;
pub mod rotor;
pub mod service;
pub mod session;
pub mod stream;
pub mod transport;
pub mod validation;

pub use access::{Access, ExistencePolicy, Identity, authorize};
pub use device::{Device, DeviceError, DeviceFactory, RotorMachineFactory};
pub use env::Environment;
pub use error::{CoreError, ErrorKind, ForbiddenReason};
pub use generator::{RandomSettingsGenerator, SettingsGenerator};
pub use registry::{MAX_ID_ATTEMPTS, SessionRegistry};
pub use rotor::RotorMachine;
pub use service::{Created, ServiceConfig, SessionService};
pub use session::{DeviceGuard, InvalidSessionId, Session, SessionId};
pub use stream::{StreamError, StreamSummary, StreamTicket, Utf8Decoder, run_stream};
pub use transport::{FrameTransport, FramedIo, TransportError};
pub use validation::{
    DEFAULT_MAX_WHEELS, PlaintextError, SettingsError, SettingsSource, WheelTable,
    validate_plaintext, validate_settings,
};
