//! Codec error type.

use std::fmt;

/// Wire format codec error.
///
/// Codec failures are non-fatal at this level: the session translates them
/// into a `ProtocolException(InvalidArgument)` and keeps the connection open.
#[derive(Debug, Clone)]
pub struct CodecError {
    /// Error message.
    pub message: String,
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

impl CodecError {
    /// Creates a new codec error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(format!("encode: {}", message.into()))
    }

    /// Creates a decoding error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(format!("decode: {}", message.into()))
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codec error: {}", self.message)
    }
}

impl std::error::Error for CodecError {}

impl serde::ser::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::encode(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::decode(msg.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<CodecError> for etpkit_protocol::EtpError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err.message)
    }
}
