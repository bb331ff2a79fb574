//! Transport frame type.

use bytes::Bytes;

/// One transport frame carrying one complete ETP message.
///
/// Binary frames carry the Avro-binary framing, text frames the JSON
/// framing; a session uses exactly one kind for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A binary frame: Avro-binary header immediately followed by the body.
    Binary(Bytes),
    /// A text frame: a JSON array of `[header, body]`.
    Text(String),
}

impl Frame {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    /// Returns `true` if the frame carries no payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short kind name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Binary(_) => "binary",
            Self::Text(_) => "text",
        }
    }
}
