//! Deterministic test support for rotorhub.
//!
//! - [`SimEnv`]: seeded environment, so ids and random wheels reproduce
//! - [`ScriptedTransport`] and [`channel_transport`]: in-memory frame
//!   transports for driving the stream engine
//! - [`fixtures`]: identities, settings and services used across tests

pub mod fixtures;
pub mod sim_env;
pub mod transport;

pub use sim_env::SimEnv;
pub use transport::{ChannelTransport, ScriptedTransport, StreamPeer, channel_transport};
