//! Transport configuration.

use etpkit_wire::MessageEncoding;

/// WebSocket transport parameters.
///
/// The subprotocol and encoding header names are configuration, not
/// process-wide constants, so embeddings that deviate from the standard
/// values can inject their own.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// WebSocket subprotocol requested and echoed (`etp`).
    pub subprotocol: String,
    /// Name of the handshake header carrying the encoding.
    pub encoding_header: String,
    /// Encoding a client announces; servers latch the peer's value instead.
    pub encoding: MessageEncoding,
    /// Maximum frame payload this endpoint sends, if bounded.
    pub max_frame_size: Option<usize>,
    /// Additional client handshake headers.
    pub headers: Vec<(String, String)>,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            subprotocol: "etp".to_owned(),
            encoding_header: MessageEncoding::HEADER_NAME.to_owned(),
            encoding: MessageEncoding::Binary,
            max_frame_size: Some(16 * 1024 * 1024),
            headers: Vec::new(),
        }
    }
}

impl WebSocketConfig {
    /// A config announcing the JSON framing.
    pub fn json() -> Self {
        Self {
            encoding: MessageEncoding::Json,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_binary_etp() {
        let config = WebSocketConfig::default();
        assert_eq!(config.subprotocol, "etp");
        assert_eq!(config.encoding_header, "etp-encoding");
        assert_eq!(config.encoding, MessageEncoding::Binary);
        assert_eq!(WebSocketConfig::json().encoding, MessageEncoding::Json);
    }
}
