//! Store-side accept.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::net::TcpStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};

use etpkit_transport_traits::{TransportError, TransportResult};
use etpkit_wire::MessageEncoding;

use crate::config::WebSocketConfig;
use crate::transport::{ServerTransport, WebSocketTransport};

/// An upgraded store-side connection.
#[derive(Debug)]
pub struct AcceptedSession {
    /// The frame transport for the session.
    pub transport: ServerTransport,
    /// Encoding latched from the peer's handshake header; binary when the
    /// header was absent.
    pub encoding: MessageEncoding,
    /// The upgrade request headers, lowercase names.
    pub headers: HashMap<String, String>,
}

/// Upgrades an inbound TCP connection to an ETP WebSocket.
///
/// Captures the upgrade headers, echoes the configured subprotocol when the
/// client offered it, and latches the message encoding from the encoding
/// header. An unknown encoding value fails the accept.
pub async fn accept(stream: TcpStream, config: &WebSocketConfig) -> TransportResult<AcceptedSession> {
    let endpoint = stream.peer_addr().ok().map(|addr| addr.to_string());
    let captured: Arc<Mutex<HashMap<String, String>>> = Arc::new(Mutex::new(HashMap::new()));

    let captured_in_callback = captured.clone();
    let subprotocol = config.subprotocol.clone();
    let callback = move |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
        let mut headers = captured_in_callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (name, value) in request.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_owned());
            }
        }

        let offered = request
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|offered| {
                offered
                    .split(',')
                    .any(|candidate| candidate.trim().eq_ignore_ascii_case(&subprotocol))
            });
        if offered && let Ok(value) = HeaderValue::from_str(&subprotocol) {
            response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }
        Ok(response)
    };

    let stream = accept_hdr_async(stream, callback)
        .await
        .map_err(|err| TransportError::HandshakeFailed(err.to_string()))?;

    let headers = captured
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    let encoding = match headers.get(&config.encoding_header.to_ascii_lowercase()) {
        Some(value) => MessageEncoding::from_header_value(value).ok_or_else(|| {
            TransportError::HandshakeFailed(format!("unsupported message encoding {value:?}"))
        })?,
        None => MessageEncoding::Binary,
    };
    tracing::debug!(?encoding, endpoint = endpoint.as_deref(), "websocket connection accepted");

    Ok(AcceptedSession {
        transport: WebSocketTransport::new(stream, endpoint, config.max_frame_size),
        encoding,
        headers,
    })
}
