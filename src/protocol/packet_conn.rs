//! Packet adapter: a byte stream presented as a connectionless datagram endpoint.
//!
//! Every `send_to` writes exactly one frame while holding the write lock, so
//! concurrent senders never interleave partial frames. `recv_from` pulls one
//! frame at a time and skips frames whose address cannot be decoded or
//! resolved; all other errors end the call.
//!
//! `close` wakes every pending `recv_from` and `send_to` with
//! `ConnectionClosed` before shutting down the stream.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::address::Endpoint;
use crate::core::frame::{encode_frame, read_datagram_with_limits, FrameLimits};
use crate::error::{constants, ProtocolError, Result};
use crate::transport::StreamConn;
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{with_deadline, Deadline};

/// UDP-style endpoint over a reliable stream
pub struct UotPacketConn<S> {
    // Single logical reader; the lock only makes `&self` reads sound.
    reader: Mutex<ReadHalf<S>>,
    writer: Mutex<WriteHalf<S>>,
    local_addr: Option<SocketAddr>,
    limits: FrameLimits,
    read_deadline: Deadline,
    write_deadline: Deadline,
    closed: AtomicBool,
    close_signal: CancellationToken,
    metrics: Arc<Metrics>,
}

impl<S: StreamConn> UotPacketConn<S> {
    /// Wrap an established stream using the default frame limits.
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, FrameLimits::default())
    }

    pub fn with_limits(stream: S, limits: FrameLimits) -> Self {
        let local_addr = stream.local_addr().ok();
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            local_addr,
            limits,
            read_deadline: Deadline::default(),
            write_deadline: Deadline::default(),
            closed: AtomicBool::new(false),
            close_signal: CancellationToken::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Receive one datagram into `buf`, returning its length and source.
    ///
    /// A datagram larger than `buf` fails with `ShortBuffer`; its frame has
    /// already been consumed, so later reads continue at the next frame.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        self.ensure_open()?;
        tokio::select! {
            result = with_deadline(&self.read_deadline, self.recv_loop(buf)) => result,
            () = self.close_signal.cancelled() => Err(ProtocolError::ConnectionClosed),
        }
    }

    async fn recv_loop(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let mut reader = self.reader.lock().await;
        loop {
            let datagram = match read_datagram_with_limits(&mut *reader, &self.limits).await {
                Ok(datagram) => datagram,
                Err(ProtocolError::InvalidAddress(reason)) => {
                    debug!(%reason, "Discarding datagram with undecodable address");
                    self.metrics.datagram_discarded();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let len = datagram.payload.len();
            if len > buf.len() {
                self.metrics.datagram_oversized();
                return Err(ProtocolError::ShortBuffer {
                    needed: len,
                    available: buf.len(),
                });
            }

            let source = match datagram.destination.resolve().await {
                Ok(source) => source,
                Err(e) => {
                    debug!(address = %datagram.destination, error = %e, "Discarding datagram with invalid address");
                    self.metrics.datagram_discarded();
                    continue;
                }
            };

            buf[..len].copy_from_slice(&datagram.payload);
            self.metrics.datagram_received(len as u64);
            return Ok((len, source));
        }
    }

    /// Send `payload` to `target`, returning the payload length.
    ///
    /// `None` fails with `NilAddress`. The frame is encoded before the write
    /// lock is taken; the lock covers the stream write only.
    pub async fn send_to(&self, payload: &[u8], target: Option<&Endpoint>) -> Result<usize> {
        let target = target.ok_or(ProtocolError::NilAddress)?;
        self.ensure_open()?;

        let mut frame = BytesMut::new();
        if let Err(e) = encode_frame(target, payload, &self.limits, &mut frame) {
            self.metrics.send_error();
            return Err(e);
        }

        let write = with_deadline(&self.write_deadline, async {
            let mut writer = self.writer.lock().await;
            writer.write_all(&frame).await?;
            writer.flush().await?;
            Ok::<(), ProtocolError>(())
        });
        tokio::select! {
            result = write => result?,
            () = self.close_signal.cancelled() => return Err(ProtocolError::ConnectionClosed),
        }

        self.metrics.datagram_sent(payload.len() as u64);
        Ok(payload.len())
    }

    /// Send to a concrete socket address.
    pub async fn send_to_addr(&self, payload: &[u8], target: SocketAddr) -> Result<usize> {
        self.send_to(payload, Some(&Endpoint::from(target))).await
    }

    /// Shut down the stream. Calling it again is a no-op.
    ///
    /// Pending `recv_from` and `send_to` calls return `ConnectionClosed`. A
    /// frame cut short by close is never completed.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Wake pending calls first so a stalled writer releases its lock
        self.close_signal.cancel();
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        debug!("UoT packet connection closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Local address of the underlying stream
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.local_addr.ok_or_else(|| {
            ProtocolError::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                constants::ERR_NO_LOCAL_ADDR,
            ))
        })
    }

    /// Set both deadlines. `None` clears them.
    pub fn set_deadline(&self, at: Option<Instant>) {
        self.read_deadline.set(at);
        self.write_deadline.set(at);
    }

    pub fn set_read_deadline(&self, at: Option<Instant>) {
        self.read_deadline.set(at);
    }

    pub fn set_write_deadline(&self, at: Option<Instant>) {
        self.write_deadline.set(at);
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Recover the underlying stream.
    pub fn into_inner(self) -> S {
        let reader = self.reader.into_inner();
        let writer = self.writer.into_inner();
        reader.unsplit(writer)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for UotPacketConn<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UotPacketConn")
            .field("local_addr", &self.local_addr)
            .field("limits", &self.limits)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
