//! In-process duplex transport.
//!
//! Two channel-backed endpoints wired back to back. Frames sent on one end
//! arrive on the other in order. Used by the session integration tests and
//! for same-process store/customer wiring.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{TransportError, TransportResult};
use crate::frame::Frame;
use crate::traits::Transport;

const CHANNEL_CAPACITY: usize = 64;

/// One end of an in-process transport pair.
#[derive(Debug)]
pub struct InProcTransport {
    label: &'static str,
    // Dropped on close so the peer's receive loop observes end-of-stream.
    tx: Mutex<Option<mpsc::Sender<Frame>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Frame>>,
}

impl InProcTransport {
    /// Creates a connected pair of endpoints.
    pub fn pair() -> (InProcTransport, InProcTransport) {
        let (left_tx, left_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (right_tx, right_rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            InProcTransport {
                label: "inproc-a",
                tx: Mutex::new(Some(left_tx)),
                rx: tokio::sync::Mutex::new(right_rx),
            },
            InProcTransport {
                label: "inproc-b",
                tx: Mutex::new(Some(right_tx)),
                rx: tokio::sync::Mutex::new(left_rx),
            },
        )
    }

    fn sender(&self) -> TransportResult<mpsc::Sender<Frame>> {
        self.tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Transport for InProcTransport {
    async fn send(&self, frame: Frame) -> TransportResult<()> {
        let sender = self.sender()?;
        sender
            .send(frame)
            .await
            .map_err(|_| TransportError::ConnectionLost("peer endpoint dropped".into()))
    }

    async fn receive(&self) -> TransportResult<Option<Frame>> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        let dropped = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .is_some();
        if dropped {
            tracing::debug!(endpoint = self.label, "in-process transport closed");
        }
        Ok(())
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.label.to_owned())
    }
}
