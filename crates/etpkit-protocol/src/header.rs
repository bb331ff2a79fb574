//! Message header and protocol identifiers.
//!
//! Every ETP message travels with a uniform [`MessageHeader`] envelope. On the
//! wire the header fields are `protocol:int`, `messageType:int`,
//! `messageId:long`, `correlationId:long`, `messageFlags:int`, in that order.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Numeric protocol identifier, a namespace within ETP.
///
/// The well-known ids are exposed as associated constants; values outside the
/// known set are representable so that unknown-protocol traffic can still be
/// decoded and answered with `ProtocolException(UnsupportedProtocol)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolId(pub u16);

impl ProtocolId {
    /// Core session protocol (negotiation, close, protocol exceptions).
    pub const CORE: Self = Self(0);
    /// Channel streaming.
    pub const CHANNEL_STREAMING: Self = Self(1);
    /// Channel data frames.
    pub const CHANNEL_DATA_FRAME: Self = Self(2);
    /// Store catalog discovery.
    pub const DISCOVERY: Self = Self(3);
    /// Data object store access.
    pub const STORE: Self = Self(4);
    /// Store change notifications.
    pub const STORE_NOTIFICATION: Self = Self(5);
    /// Growing data objects (logs, trajectories).
    pub const GROWING_OBJECT: Self = Self(6);
    /// Multidimensional data arrays.
    pub const DATA_ARRAY: Self = Self(7);
    /// Store transactions (ETP 1.2).
    pub const TRANSACTION: Self = Self(18);
    /// Dataspace management (ETP 1.2).
    pub const DATASPACE: Self = Self(24);

    /// Returns a short human-readable name for the well-known protocols.
    pub fn name(self) -> &'static str {
        match self {
            Self::CORE => "Core",
            Self::CHANNEL_STREAMING => "ChannelStreaming",
            Self::CHANNEL_DATA_FRAME => "ChannelDataFrame",
            Self::DISCOVERY => "Discovery",
            Self::STORE => "Store",
            Self::STORE_NOTIFICATION => "StoreNotification",
            Self::GROWING_OBJECT => "GrowingObject",
            Self::DATA_ARRAY => "DataArray",
            Self::TRANSACTION => "Transaction",
            Self::DATASPACE => "Dataspace",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

impl From<u16> for ProtocolId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Message flags bitfield carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageFlags(pub u32);

impl MessageFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// The message is one part of a multipart response set.
    pub const MULTI_PART: Self = Self(0x1);
    /// The message is the final part of its exchange.
    pub const FINAL_PART: Self = Self(0x2);
    /// Combined multipart + final part.
    pub const MULTI_PART_AND_FINAL_PART: Self = Self(0x3);
    /// The body carries no data.
    pub const NO_DATA: Self = Self(0x4);
    /// The body is compressed.
    pub const COMPRESSED: Self = Self(0x8);

    /// Returns `true` if every flag in `other` is set on `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if the multipart bit is set.
    pub const fn is_multi_part(self) -> bool {
        self.contains(Self::MULTI_PART)
    }

    /// Returns `true` if the final-part bit is set.
    pub const fn is_final_part(self) -> bool {
        self.contains(Self::FINAL_PART)
    }

    /// Flags for part `index` out of `count` messages in a response set.
    ///
    /// A single-message response carries `FinalPart` alone; in a larger set
    /// every part carries `MultiPart` and only the last adds `FinalPart`,
    /// keeping exactly one `FinalPart` per correlation.
    pub fn for_part(index: usize, count: usize) -> Self {
        if count <= 1 {
            Self::FINAL_PART
        } else if index + 1 == count {
            Self::MULTI_PART_AND_FINAL_PART
        } else {
            Self::MULTI_PART
        }
    }
}

impl BitOr for MessageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The uniform envelope carried by every ETP message.
///
/// `message_id` is assigned by the sender at send time and strictly increases
/// within a session. `correlation_id` is 0 for a message that initiates an
/// exchange, otherwise the `message_id` of the message it replies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    /// Numeric protocol id.
    pub protocol: ProtocolId,
    /// Protocol-scoped message type id.
    pub message_type: u16,
    /// Sender-assigned, monotonically increasing message id.
    pub message_id: i64,
    /// Id of the message this replies to, or 0 for an initiating message.
    pub correlation_id: i64,
    /// Flags bitfield.
    pub message_flags: MessageFlags,
}

impl MessageHeader {
    /// Builds a header for a message that initiates an exchange.
    ///
    /// The `message_id` is left at 0; the session stamps it inside the send
    /// critical section.
    pub fn request(protocol: ProtocolId, message_type: u16) -> Self {
        Self {
            protocol,
            message_type,
            message_id: 0,
            correlation_id: 0,
            message_flags: MessageFlags::NONE,
        }
    }

    /// Builds a header for a message replying to `correlation_id`.
    pub fn response(
        protocol: ProtocolId,
        message_type: u16,
        correlation_id: i64,
        message_flags: MessageFlags,
    ) -> Self {
        Self {
            protocol,
            message_type,
            message_id: 0,
            correlation_id,
            message_flags,
        }
    }

    /// Returns `true` if this message initiates an exchange.
    pub const fn is_request(&self) -> bool {
        self.correlation_id == 0
    }

    /// Returns `true` if this message terminates its response set.
    ///
    /// A reply that is not marked multipart is a complete single-message
    /// response and therefore final even without the explicit bit.
    pub const fn is_final(&self) -> bool {
        self.message_flags.is_final_part() || !self.message_flags.is_multi_part()
    }
}

impl fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} type={} id={} corr={} flags={:#x}",
            self.protocol, self.message_type, self.message_id, self.correlation_id, self.message_flags.0
        )
    }
}
