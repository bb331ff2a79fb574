//! The core transport trait.

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::frame::Frame;

/// A frame-oriented, full-duplex message channel.
///
/// Implementations must tolerate concurrent `send` and `receive` calls, but
/// may assume a single logical writer and a single logical reader: the
/// session serializes sends under its send lock and reads from one receive
/// task.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends a single frame.
    async fn send(&self, frame: Frame) -> TransportResult<()>;

    /// Receives the next frame, suspending until one arrives.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection and all
    /// buffered frames have been drained.
    async fn receive(&self) -> TransportResult<Option<Frame>>;

    /// Closes the connection. Idempotent and best-effort.
    async fn close(&self) -> TransportResult<()>;

    /// The endpoint address or identifier, if applicable.
    fn endpoint(&self) -> Option<String> {
        None
    }

    /// The largest frame this transport will carry, if bounded.
    fn max_frame_size(&self) -> Option<usize> {
        None
    }
}
