//! In-memory frame transports.
//!
//! [`ScriptedTransport`] replays a fixed list of inbound frames and records
//! what the engine sends. [`ChannelTransport`] is driven live by a
//! [`StreamPeer`] from another task, for tests that interleave other
//! operations between frames.

use std::{collections::VecDeque, io};

use bytes::Bytes;
use rotorhub_core::{FrameTransport, TransportError};
use rotorhub_proto::{Frame, MessageKind, StreamFrame};
use tokio::sync::mpsc;

/// Transport replaying scripted inbound frames.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inbound: VecDeque<Frame>,
    sent: Vec<Frame>,
    fail_after_sends: Option<usize>,
    stall_after_sends: Option<usize>,
}

impl ScriptedTransport {
    /// Transport that yields `frames` in order, then reports EOF.
    pub fn new(frames: impl IntoIterator<Item = StreamFrame>) -> Self {
        Self {
            inbound: frames.into_iter().map(StreamFrame::into_frame).collect(),
            ..Self::default()
        }
    }

    /// Queue a raw wire frame (for protocol violations).
    #[must_use]
    pub fn with_raw(mut self, frame: Frame) -> Self {
        self.inbound.push_back(frame);
        self
    }

    /// Fail every send after the first `count` succeed.
    #[must_use]
    pub fn fail_after_sends(mut self, count: usize) -> Self {
        self.fail_after_sends = Some(count);
        self
    }

    /// Never complete any send after the first `count` succeed.
    #[must_use]
    pub fn stall_after_sends(mut self, count: usize) -> Self {
        self.stall_after_sends = Some(count);
        self
    }

    /// Frames sent so far, as stream frames.
    pub fn sent(&self) -> Vec<StreamFrame> {
        self.sent.iter().cloned().filter_map(|f| StreamFrame::from_frame(f).ok()).collect()
    }

    /// Concatenated payload text of every sent data frame.
    pub fn sent_text(&self) -> String {
        self.sent()
            .into_iter()
            .filter_map(|frame| match frame {
                StreamFrame::Data { payload, .. } => {
                    Some(String::from_utf8_lossy(&payload).into_owned())
                },
                StreamFrame::Close => None,
            })
            .collect()
    }
}

impl FrameTransport for ScriptedTransport {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        Ok(self.inbound.pop_front())
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        if self.stall_after_sends.is_some_and(|limit| self.sent.len() >= limit) {
            std::future::pending::<()>().await;
        }
        if self.fail_after_sends.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted send failure").into());
        }
        self.sent.push(frame);
        Ok(())
    }
}

/// Engine side of a live in-memory stream.
#[derive(Debug)]
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<Frame>,
}

/// Test side of a live in-memory stream.
#[derive(Debug)]
pub struct StreamPeer {
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

/// Connected transport and peer.
pub fn channel_transport() -> (ChannelTransport, StreamPeer) {
    let (to_engine, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_engine) = mpsc::unbounded_channel();

    (
        ChannelTransport { inbound: from_peer, outbound: to_peer },
        StreamPeer { outbound: Some(to_engine), inbound: from_engine },
    )
}

impl FrameTransport for ChannelTransport {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.outbound.send(frame).map_err(|_| {
            TransportError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "peer dropped"))
        })
    }
}

impl StreamPeer {
    /// Send a final text fragment.
    pub fn send_text(&self, text: &str) {
        self.send(StreamFrame::text(text));
    }

    /// Send raw bytes as one data frame.
    pub fn send_bytes(&self, kind: MessageKind, fin: bool, bytes: &[u8]) {
        self.send(StreamFrame::Data { kind, fin, payload: Bytes::copy_from_slice(bytes) });
    }

    /// Send the close signal.
    pub fn close(&self) {
        self.send(StreamFrame::Close);
    }

    /// Stop sending. The engine observes EOF.
    pub fn finish(&mut self) {
        self.outbound = None;
    }

    /// Next reply from the engine. `None` once the engine has returned.
    pub async fn recv(&mut self) -> Option<StreamFrame> {
        let frame = self.inbound.recv().await?;
        StreamFrame::from_frame(frame).ok()
    }

    /// Receive `count` replies and concatenate their text.
    pub async fn recv_text(&mut self, count: usize) -> String {
        let mut text = String::new();
        for _ in 0..count {
            match self.recv().await {
                Some(StreamFrame::Data { payload, .. }) => {
                    text.push_str(&String::from_utf8_lossy(&payload));
                },
                Some(StreamFrame::Close) | None => break,
            }
        }
        text
    }

    fn send(&self, frame: StreamFrame) {
        if let Some(tx) = &self.outbound {
            // Engine may already have exited; the test observes that separately
            let _ = tx.send(frame.into_frame());
        }
    }
}
