//! Record stream over a framed byte stream

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::config::WireConfig;
use crate::core::codec::FrameCodec;
use crate::core::schema::StructDescriptor;
use crate::core::value::Record;
use crate::error::{CodecError, Result};
use crate::protocol::codec::StructCodec;
use crate::utils::metrics::{CodecMetrics, Timer};

/// Sends and receives whole records as frames over `T`
pub struct RecordStream<T> {
    framed: Framed<T, FrameCodec>,
    codec: StructCodec,
    send_timeout: Option<Duration>,
    recv_timeout: Option<Duration>,
    last_activity: Instant,
}

async fn with_timeout<F, V>(limit: Option<Duration>, fut: F) -> Result<V>
where
    F: std::future::Future<Output = Result<V>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            CodecError::Transport(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"))
        })?,
        None => fut.await,
    }
}

impl<T> RecordStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(io: T, codec: StructCodec, max_frame_size: usize) -> Self {
        Self {
            framed: Framed::new(io, FrameCodec::new(max_frame_size)),
            codec,
            send_timeout: None,
            recv_timeout: None,
            last_activity: Instant::now(),
        }
    }

    /// Build a stream from a full configuration
    pub fn from_config(io: T, config: &WireConfig) -> Self {
        Self::new(
            io,
            StructCodec::new(config.codec.clone()),
            config.transport.max_frame_size,
        )
    }

    /// Report codec and frame counters into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<CodecMetrics>) -> Self {
        self.codec = self.codec.with_metrics(metrics);
        self
    }

    /// Set custom timeout durations
    pub fn with_timeouts(mut self, send_timeout: Duration, recv_timeout: Duration) -> Self {
        self.send_timeout = Some(send_timeout);
        self.recv_timeout = Some(recv_timeout);
        self
    }

    pub fn codec(&self) -> &StructCodec {
        &self.codec
    }

    /// Get the time since the last frame was sent or received
    pub fn time_since_last_activity(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }

    /// Encode `record` and send it as one frame
    #[instrument(skip_all, level = "debug", fields(record = %record.name()))]
    pub async fn send(&mut self, record: &Record) -> Result<()> {
        let _timer = Timer::start("record_send");
        let payload = self.codec.encode_to_vec(record).await?;
        let len = payload.len();

        let framed = &mut self.framed;
        with_timeout(self.send_timeout, async {
            framed.send(Bytes::from(payload)).await
        })
        .await?;

        if let Some(metrics) = self.codec.metrics() {
            metrics.frame_sent(len as u64);
        }
        debug!(bytes = len, "Sent record frame");
        self.last_activity = Instant::now();
        Ok(())
    }

    /// Receive the next frame and decode it as `descriptor`.
    ///
    /// Returns `Ok(None)` when the peer closed the stream between frames.
    /// Bytes left in a frame after the struct are a protocol error.
    #[instrument(skip_all, level = "debug", fields(record = %descriptor.name()))]
    pub async fn recv(&mut self, descriptor: &Arc<StructDescriptor>) -> Result<Option<Record>> {
        let framed = &mut self.framed;
        let frame = with_timeout(self.recv_timeout, async { framed.next().await.transpose() })
            .await?;
        let Some(frame) = frame else {
            debug!("Stream closed");
            return Ok(None);
        };

        let _timer = Timer::start("record_recv");
        if let Some(metrics) = self.codec.metrics() {
            metrics.frame_received(frame.len() as u64);
        }
        self.last_activity = Instant::now();

        let record = self.codec.decode_from_slice(&frame, descriptor).await?;
        Ok(Some(record))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::types::TypeDescriptor;

    fn point() -> Arc<StructDescriptor> {
        StructDescriptor::builder("Point")
            .optional(1, "x", TypeDescriptor::I32)
            .optional(2, "y", TypeDescriptor::I32)
            .build()
            .expect("descriptor")
    }

    #[tokio::test]
    async fn test_send_recv_over_duplex() {
        let (a, b) = tokio::io::duplex(1024);
        let mut left = RecordStream::from_config(a, &WireConfig::default());
        let mut right = RecordStream::from_config(b, &WireConfig::default());

        let desc = point();
        let record = Record::new(desc.clone()).with("x", 7).expect("set x");
        left.send(&record).await.expect("send");

        let got = right.recv(&desc).await.expect("recv").expect("frame");
        assert_eq!(got, record);
        assert!(got.is_set("x"));
        assert!(!got.is_set("y"));
    }

    #[tokio::test]
    async fn test_recv_none_on_close() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        let mut right = RecordStream::from_config(b, &WireConfig::default());
        assert!(right.recv(&point()).await.expect("recv").is_none());
    }

    #[tokio::test]
    async fn test_trailing_bytes_rejected() {
        use tokio::io::AsyncWriteExt;

        let (mut a, b) = tokio::io::duplex(64);
        // one stop byte plus one stray byte
        a.write_all(&[0, 0, 0, 2, 0x00, 0xFF]).await.unwrap();
        let mut right = RecordStream::from_config(b, &WireConfig::default());
        let err = right.recv(&point()).await.expect_err("trailing byte");
        assert!(matches!(err, CodecError::Protocol(_)));
    }
}
