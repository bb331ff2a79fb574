//! The frame transport over a WebSocket stream.

use std::fmt;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use etpkit_transport_traits::{Frame, Transport, TransportError, TransportResult};

/// Client-side transport type (plain or TLS TCP).
pub type ClientTransport = WebSocketTransport<MaybeTlsStream<TcpStream>>;
/// Server-side transport type.
pub type ServerTransport = WebSocketTransport<TcpStream>;

/// One ETP message per WebSocket frame over a split stream.
///
/// The write half sits behind its own lock; the session's send lock is the
/// single writer in practice, and the session's receive task is the single
/// reader of the read half.
pub struct WebSocketTransport<S> {
    writer: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    reader: Mutex<SplitStream<WebSocketStream<S>>>,
    endpoint: Option<String>,
    max_frame_size: Option<usize>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an upgraded WebSocket stream.
    pub fn new(
        stream: WebSocketStream<S>,
        endpoint: Option<String>,
        max_frame_size: Option<usize>,
    ) -> Self {
        let (writer, reader) = stream.split();
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            endpoint,
            max_frame_size,
        }
    }
}

#[async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, frame: Frame) -> TransportResult<()> {
        if let Some(max) = self.max_frame_size
            && frame.len() > max
        {
            return Err(TransportError::FrameTooLarge {
                size: frame.len(),
                max,
            });
        }
        let message = match frame {
            Frame::Binary(payload) => Message::Binary(payload),
            Frame::Text(payload) => Message::Text(payload.into()),
        };
        self.writer
            .lock()
            .await
            .send(message)
            .await
            .map_err(|err| match err {
                WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
                other => TransportError::SendFailed(other.to_string()),
            })
    }

    async fn receive(&self) -> TransportResult<Option<Frame>> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                None => return Ok(None),
                Some(Ok(Message::Binary(payload))) => return Ok(Some(Frame::Binary(payload))),
                Some(Ok(Message::Text(payload))) => {
                    return Ok(Some(Frame::Text(payload.to_string())));
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                // Ping/pong keep-alives are handled by the WebSocket layer.
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(None),
                Some(Err(err)) => return Err(TransportError::ConnectionLost(err.to_string())),
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.send(Message::Close(None)).await {
            tracing::debug!(error = %err, "close frame not delivered");
        }
        let _ = writer.flush().await;
        Ok(())
    }

    fn endpoint(&self) -> Option<String> {
        self.endpoint.clone()
    }

    fn max_frame_size(&self) -> Option<usize> {
        self.max_frame_size
    }
}

impl<S> fmt::Debug for WebSocketTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("endpoint", &self.endpoint)
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}
