//! Character streaming engine.
//!
//! Drives a session's device across a frame transport. Each inbound data
//! frame is decoded as UTF-8 and every character is encrypted and sent back
//! in its own frame, in arrival order, echoing the inbound message kind and
//! FIN flag.
//!
//! # Locking
//!
//! The device lock is taken only after a frame has arrived and is held while
//! that frame's characters are encrypted and emitted. It is never held while
//! waiting for the next frame, so other operations on the session interleave
//! between frames.
//!
//! # Termination
//!
//! However the loop exits (close frame, peer EOF, transport error, device
//! failure, session deleted), the device's rotors are reset before the engine
//! returns. A stream future dropped before completion (timeout, task abort)
//! resets the device from `Drop`. The session itself stays registered.

use std::sync::Arc;

use bytes::Bytes;
use rotorhub_proto::{MessageKind, ProtocolError, StreamFrame};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::{
    error::CoreError,
    session::{DeviceGuard, Session, SessionId},
    transport::{FrameTransport, TransportError},
};

/// Errors that end a stream.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Transport failed
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// Peer sent a frame that is not a stream frame
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// Session or device failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Permission to stream against one session.
///
/// Issued by [`crate::SessionService::open_stream`] after the ownership check
/// and once the device is known to be configured.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    session: Arc<Session>,
}

impl StreamTicket {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Session this ticket is bound to.
    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }
}

/// Counters for a finished stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Data frames received
    pub frames_in: u64,
    /// Characters encrypted and sent
    pub chars_out: u64,
    /// Whether the peer sent an explicit close
    pub closed_by_peer: bool,
}

/// Incremental UTF-8 decoder.
///
/// An incomplete sequence at the end of one chunk is held back and completed
/// by the next. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode `bytes`, returning every character completed so far.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<char> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut chars = Vec::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    chars.extend(valid.chars());
                    rest = &[];
                    break;
                },
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    chars.extend(String::from_utf8_lossy(valid).chars());
                    match err.error_len() {
                        Some(len) => {
                            chars.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        },
                        None => {
                            rest = tail;
                            break;
                        },
                    }
                },
            }
        }

        self.pending = rest.to_vec();
        chars
    }

    /// Bytes held back waiting for the rest of a sequence.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Run a stream to completion.
///
/// Returns once the peer closes or finishes, or with the error that ended
/// the stream. The device is reset in every case, including when this future
/// is dropped before it completes.
///
/// # Errors
///
/// - `StreamError::Transport` if receiving or sending fails
/// - `StreamError::Protocol` for non-stream frames
/// - `StreamError::Core` if the session is deleted or the device fails
pub async fn run_stream<T: FrameTransport>(
    ticket: StreamTicket,
    transport: &mut T,
) -> Result<StreamSummary, StreamError> {
    let session = ticket.session;
    let mut device = ResetOnExit::new(Arc::clone(&session));
    let mut summary = StreamSummary::default();

    let result = drive(&session, &mut device, transport, &mut summary).await;
    device.finish().await;

    match &result {
        Ok(()) => info!(
            session_id = %session.id(),
            frames = summary.frames_in,
            chars = summary.chars_out,
            "stream finished"
        ),
        Err(e) => warn!(session_id = %session.id(), error = %e, "stream terminated"),
    }

    result.map(|()| summary)
}

async fn drive<T: FrameTransport>(
    session: &Session,
    device: &mut ResetOnExit,
    transport: &mut T,
    summary: &mut StreamSummary,
) -> Result<(), StreamError> {
    let mut decoder = Utf8Decoder::default();

    loop {
        let Some(frame) = transport.recv().await? else {
            debug!(session_id = %session.id(), "peer finished without close");
            break;
        };

        let (kind, fin, payload) = match StreamFrame::from_frame(frame)? {
            StreamFrame::Close => {
                summary.closed_by_peer = true;
                break;
            },
            StreamFrame::Data { kind, fin, payload } => (kind, fin, payload),
        };
        summary.frames_in += 1;

        let chars = decoder.decode(&payload);
        if chars.is_empty() {
            continue;
        }

        // On error the guard stays held so the final reset happens under it
        let guard = device.hold().await?;
        for c in chars {
            let encrypted = guard.encrypt_char(c).map_err(CoreError::from)?;
            transport.send(reply(kind, fin, encrypted)).await?;
            summary.chars_out += 1;
        }
        device.release();
    }

    if decoder.pending() > 0 {
        debug!(
            session_id = %session.id(),
            bytes = decoder.pending(),
            "discarding incomplete trailing sequence"
        );
    }

    Ok(())
}

/// Stream-scoped device access that resets the rotors when the stream ends.
///
/// The per-frame guard is kept here so that dropping the stream mid-frame
/// resets the device before the lock is released. Dropped between frames,
/// the reset takes the lock if it is free and otherwise queues behind the
/// current holder.
struct ResetOnExit {
    session: Arc<Session>,
    held: Option<DeviceGuard>,
    armed: bool,
}

impl ResetOnExit {
    fn new(session: Arc<Session>) -> Self {
        Self { session, held: None, armed: true }
    }

    /// Exclusive access for the current frame.
    async fn hold(&mut self) -> Result<&mut DeviceGuard, CoreError> {
        let guard = match self.held.take() {
            Some(guard) => guard,
            None => self.session.lock().await?,
        };
        Ok(self.held.insert(guard))
    }

    /// End the current frame, keeping the rotor position.
    fn release(&mut self) {
        self.held = None;
    }

    /// Reset under the lock before anyone else can observe the device.
    async fn finish(mut self) {
        let guard = match self.held.take() {
            Some(guard) => Ok(guard),
            None => self.session.lock().await,
        };
        match guard {
            Ok(mut device) => device.reset(),
            Err(_) => debug!(session_id = %self.session.id(), "session deleted during stream"),
        }
        self.armed = false;
    }
}

impl Drop for ResetOnExit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let session_id = self.session.id();
        if let Some(mut device) = self.held.take() {
            device.reset();
            debug!(%session_id, "stream dropped mid-frame, device reset");
            return;
        }

        match self.session.try_lock() {
            Some(Ok(mut device)) => {
                device.reset();
                debug!(%session_id, "stream dropped, device reset");
            },
            Some(Err(_)) => debug!(%session_id, "stream dropped after session delete"),
            None => match Handle::try_current() {
                Ok(handle) => {
                    let session = Arc::clone(&self.session);
                    handle.spawn(async move {
                        if let Ok(mut device) = session.lock().await {
                            device.reset();
                        }
                    });
                    debug!(%session_id, "stream dropped while device busy, reset queued");
                },
                Err(_) => warn!(%session_id, "stream dropped outside a runtime, device not reset"),
            },
        }
    }
}

fn reply(kind: MessageKind, fin: bool, c: char) -> rotorhub_proto::Frame {
    let mut buf = [0u8; 4];
    let payload = Bytes::copy_from_slice(c.encode_utf8(&mut buf).as_bytes());
    StreamFrame::Data { kind, fin, payload }.into_frame()
}
