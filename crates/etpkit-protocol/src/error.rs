//! Error codes and the unified error model.
//!
//! Wire-visible failures are always expressed as a `ProtocolException` body
//! carrying one of the closed set of [`ErrorCode`]s. Internally the SDK uses
//! [`EtpError`], which layers (codec, transport, routing, lifecycle) bridge
//! into via `From` impls, mirroring how the teacher stack funnels transport
//! failures into one protocol-level error type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::header::ProtocolId;

/// Convenience result alias for session and handler operations.
pub type EtpResult<T> = Result<T, EtpError>;

/// The closed set of protocol error codes used by the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The peer addressed a protocol this session did not negotiate.
    UnsupportedProtocol,
    /// The message type id is unknown within its protocol.
    InvalidMessageType,
    /// A request argument or body failed validation or decoding.
    InvalidArgument,
    /// The peer is not authorized for the operation.
    PermissionDenied,
    /// The operation is not supported by this endpoint.
    NotSupported,
    /// The endpoint is in a state that cannot service the message.
    InvalidState,
    /// A data object URI was malformed or unresolvable.
    InvalidUri,
    /// A token, lease, or subscription has expired.
    Expired,
    /// The request was refused by policy.
    RequestDenied,
    /// A correlation deadline elapsed before the response arrived.
    Timeout,
}

impl ErrorCode {
    /// Numeric wire code.
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidMessageType => 3,
            Self::UnsupportedProtocol => 4,
            Self::InvalidArgument => 5,
            Self::PermissionDenied => 6,
            Self::NotSupported => 7,
            Self::InvalidState => 8,
            Self::InvalidUri => 9,
            Self::Expired => 10,
            Self::RequestDenied => 11,
            Self::Timeout => 16,
        }
    }

    /// Resolves a wire code back to the closed set, if it is a known code.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            3 => Some(Self::InvalidMessageType),
            4 => Some(Self::UnsupportedProtocol),
            5 => Some(Self::InvalidArgument),
            6 => Some(Self::PermissionDenied),
            7 => Some(Self::NotSupported),
            8 => Some(Self::InvalidState),
            9 => Some(Self::InvalidUri),
            10 => Some(Self::Expired),
            11 => Some(Self::RequestDenied),
            16 => Some(Self::Timeout),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsupportedProtocol => "UnsupportedProtocol",
            Self::InvalidMessageType => "InvalidMessageType",
            Self::InvalidArgument => "InvalidArgument",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotSupported => "NotSupported",
            Self::InvalidState => "InvalidState",
            Self::InvalidUri => "InvalidUri",
            Self::Expired => "Expired",
            Self::RequestDenied => "RequestDenied",
            Self::Timeout => "Timeout",
        };
        write!(f, "{name}({})", self.code())
    }
}

/// A single error entry: the wire shape of one failure.
///
/// Also used as the per-request entry in the ETP 1.2 error collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Numeric error code; usually one of [`ErrorCode`].
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

impl ErrorInfo {
    /// Builds an entry from a known error code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }

    /// Resolves the numeric code against the closed set.
    pub const fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Unified error for session, handler, and wire operations.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EtpError {
    /// The peer answered with a `ProtocolException`.
    #[error("peer protocol exception {0}")]
    Remote(ErrorInfo),

    /// Encoding or decoding failed.
    #[error("codec failure: {0}")]
    Codec(String),

    /// The underlying transport failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The session is closing or closed; nothing was sent.
    #[error("session closed")]
    SessionClosed,

    /// A correlation deadline elapsed.
    #[error("request timed out")]
    Timeout,

    /// The protocol was not negotiated for this session.
    #[error("protocol {0} is not negotiated for this session")]
    UnsupportedProtocol(ProtocolId),

    /// The message type id is unknown within its protocol.
    #[error("unknown message type {message_type} on protocol {protocol}")]
    InvalidMessageType {
        /// Protocol the message arrived on.
        protocol: ProtocolId,
        /// The unresolvable message type id.
        message_type: u16,
    },

    /// A handler contract is not registered on this session.
    #[error("handler contract not registered: {0}")]
    NotSupported(String),

    /// The operation is invalid in the current session state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A request argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EtpError {
    /// The wire code an outbound `ProtocolException` for this error carries.
    pub fn wire_code(&self) -> ErrorCode {
        match self {
            Self::Remote(info) => info.error_code().unwrap_or(ErrorCode::InvalidState),
            Self::Codec(_) | Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::UnsupportedProtocol(_) => ErrorCode::UnsupportedProtocol,
            Self::InvalidMessageType { .. } => ErrorCode::InvalidMessageType,
            Self::NotSupported(_) => ErrorCode::NotSupported,
            Self::Timeout => ErrorCode::Timeout,
            Self::Transport(_) | Self::SessionClosed | Self::InvalidState(_) => {
                ErrorCode::InvalidState
            }
        }
    }

    /// Converts the error into its wire entry.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            Self::Remote(info) => info.clone(),
            other => ErrorInfo::new(other.wire_code(), other.to_string()),
        }
    }
}

impl From<ErrorInfo> for EtpError {
    fn from(info: ErrorInfo) -> Self {
        Self::Remote(info)
    }
}
