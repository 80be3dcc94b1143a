//! Observability and Metrics
//!
//! Per-adapter datagram counters.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Datagram counters for one packet adapter
#[derive(Debug)]
pub struct Metrics {
    /// Datagrams written to the stream
    pub datagrams_sent: AtomicU64,
    /// Datagrams delivered to the caller
    pub datagrams_received: AtomicU64,
    /// Payload bytes written
    pub bytes_sent: AtomicU64,
    /// Payload bytes delivered
    pub bytes_received: AtomicU64,
    /// Frames skipped because their address could not be decoded or resolved
    pub datagrams_discarded: AtomicU64,
    /// Frames dropped because the caller buffer was too small
    pub datagrams_oversized: AtomicU64,
    /// Frames rejected on send (bad address or size limit)
    pub send_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            datagrams_sent: AtomicU64::new(0),
            datagrams_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            datagrams_discarded: AtomicU64::new(0),
            datagrams_oversized: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn datagram_sent(&self, byte_count: u64) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn datagram_received(&self, byte_count: u64) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn datagram_discarded(&self) {
        self.datagrams_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn datagram_oversized(&self) {
        self.datagrams_oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            datagrams_discarded: self.datagrams_discarded.load(Ordering::Relaxed),
            datagrams_oversized: self.datagrams_oversized.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            datagrams_sent = snapshot.datagrams_sent,
            datagrams_received = snapshot.datagrams_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            datagrams_discarded = snapshot.datagrams_discarded,
            datagrams_oversized = snapshot.datagrams_oversized,
            send_errors = snapshot.send_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "UoT metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_sent: u64,
    pub datagrams_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub datagrams_discarded: u64,
    pub datagrams_oversized: u64,
    pub send_errors: u64,
    pub uptime_seconds: u64,
}
