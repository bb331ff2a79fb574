//! Customer-side connect.

use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue, SEC_WEBSOCKET_PROTOCOL};

use etpkit_transport_traits::{TransportError, TransportResult};

use crate::config::WebSocketConfig;
use crate::transport::{ClientTransport, WebSocketTransport};

/// Opens a WebSocket connection to an ETP store.
///
/// The upgrade request carries `Sec-WebSocket-Protocol` with the configured
/// subprotocol, the encoding header announcing the session framing, and any
/// extra configured headers.
pub async fn connect(url: &str, config: &WebSocketConfig) -> TransportResult<ClientTransport> {
    let mut request = url
        .into_client_request()
        .map_err(|err| TransportError::HandshakeFailed(err.to_string()))?;

    let headers = request.headers_mut();
    headers.insert(
        SEC_WEBSOCKET_PROTOCOL,
        header_value(&config.subprotocol)?,
    );
    headers.insert(
        header_name(&config.encoding_header)?,
        HeaderValue::from_static(config.encoding.header_value()),
    );
    for (name, value) in &config.headers {
        headers.insert(header_name(name)?, header_value(value)?);
    }

    let (stream, response) = connect_async(request)
        .await
        .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
    tracing::debug!(url, status = %response.status(), "websocket upgrade accepted");

    Ok(WebSocketTransport::new(
        stream,
        Some(url.to_owned()),
        config.max_frame_size,
    ))
}

fn header_name(name: &str) -> TransportResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| TransportError::HandshakeFailed(format!("invalid header name {name}: {err}")))
}

fn header_value(value: &str) -> TransportResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| TransportError::HandshakeFailed(format!("invalid header value: {err}")))
}
