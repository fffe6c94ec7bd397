//! Frame transport abstraction.
//!
//! The stream engine and the request dispatcher speak whole [`Frame`]s. A
//! [`FrameTransport`] moves them over some byte channel; [`FramedIo`] is the
//! implementation for any tokio reader/writer pair (QUIC streams in
//! production, in-memory duplex pipes in tests).

use std::future::Future;

use rotorhub_proto::{Frame, FrameHeader, ProtocolError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors moving frames.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Underlying I/O failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer sent bytes that do not form a valid frame
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Bidirectional frame channel.
pub trait FrameTransport: Send {
    /// Next inbound frame. `Ok(None)` when the peer has finished sending.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Frame>, TransportError>> + Send;

    /// Send one frame.
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// [`FrameTransport`] over a tokio reader and writer.
#[derive(Debug)]
pub struct FramedIo<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> FramedIo<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a reader/writer pair.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Give back the reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R, W> FrameTransport for FramedIo<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        let mut header = [0u8; FrameHeader::SIZE];
        let mut filled = 0;
        while filled < header.len() {
            let n = self.reader.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(ProtocolError::FrameTooShort {
                    expected: FrameHeader::SIZE,
                    actual: filled,
                }
                .into());
            }
            filled += n;
        }

        let payload_size = FrameHeader::from_bytes(&header)?.payload_size() as usize;
        let mut buf = vec![0u8; FrameHeader::SIZE + payload_size];
        buf[..FrameHeader::SIZE].copy_from_slice(&header);
        self.reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;

        Ok(Some(Frame::decode(&buf)?))
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let wire = frame.to_vec()?;
        self.writer.write_all(&wire).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
