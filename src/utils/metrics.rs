//! Observability and Metrics
//!
//! Counters for codec and transport activity. Uses atomic counters so one
//! instance can be shared by every task driving a codec.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{CodecError, ErrorKind};

/// Metrics collector for codec operations
#[derive(Debug)]
pub struct CodecMetrics {
    /// Records written successfully
    pub records_written: AtomicU64,
    /// Records read successfully
    pub records_read: AtomicU64,
    /// Fields consumed without being materialised
    pub fields_skipped: AtomicU64,
    /// Frames sent by a record stream
    pub frames_sent: AtomicU64,
    /// Frames received by a record stream
    pub frames_received: AtomicU64,
    /// Payload bytes sent
    pub bytes_sent: AtomicU64,
    /// Payload bytes received
    pub bytes_received: AtomicU64,
    /// Reads or writes that hit the depth limit
    pub depth_exceeded: AtomicU64,
    /// Malformed wire data
    pub protocol_errors: AtomicU64,
    /// Schema disagreements
    pub schema_errors: AtomicU64,
    /// I/O failures
    pub transport_errors: AtomicU64,
    start_time: Instant,
}

impl CodecMetrics {
    pub fn new() -> Self {
        Self {
            records_written: AtomicU64::new(0),
            records_read: AtomicU64::new(0),
            fields_skipped: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            depth_exceeded: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            schema_errors: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn field_skipped(&self) {
        self.fields_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame sent
    pub fn frame_sent(&self, byte_count: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a frame received
    pub fn frame_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Count a failed operation under its error kind
    pub fn error(&self, err: &CodecError) {
        let counter = match err.kind() {
            ErrorKind::DepthExceeded => &self.depth_exceeded,
            ErrorKind::Protocol => &self.protocol_errors,
            ErrorKind::Schema => &self.schema_errors,
            ErrorKind::Transport => &self.transport_errors,
            ErrorKind::Config => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            records_read: self.records_read.load(Ordering::Relaxed),
            fields_skipped: self.fields_skipped.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            depth_exceeded: self.depth_exceeded.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            schema_errors: self.schema_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            records_written = snapshot.records_written,
            records_read = snapshot.records_read,
            fields_skipped = snapshot.fields_skipped,
            frames_sent = snapshot.frames_sent,
            frames_received = snapshot.frames_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            depth_exceeded = snapshot.depth_exceeded,
            protocol_errors = snapshot.protocol_errors,
            schema_errors = snapshot.schema_errors,
            transport_errors = snapshot.transport_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for CodecMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_written: u64,
    pub records_read: u64,
    pub fields_skipped: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub depth_exceeded: u64,
    pub protocol_errors: u64,
    pub schema_errors: u64,
    pub transport_errors: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<std::sync::Arc<CodecMetrics>> =
    once_cell::sync::Lazy::new(|| std::sync::Arc::new(CodecMetrics::new()));

/// Process-wide metrics instance, shareable with [`StructCodec::with_metrics`](crate::protocol::codec::StructCodec::with_metrics)
pub fn global_metrics() -> std::sync::Arc<CodecMetrics> {
    std::sync::Arc::clone(&METRICS)
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
