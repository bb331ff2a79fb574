//! Core protocol (id 0) records: negotiation, close, keep-alive, and the
//! protocol exception every protocol can carry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::error::ErrorInfo;
use crate::header::ProtocolId;
use crate::version::{EtpVersion, Role, VersionRecord};

/// `RequestSession` message type id.
pub const REQUEST_SESSION: u16 = 1;
/// `OpenSession` message type id.
pub const OPEN_SESSION: u16 = 2;
/// `CloseSession` message type id.
pub const CLOSE_SESSION: u16 = 5;
/// `Ping` message type id (ETP 1.2).
pub const PING: u16 = 10;
/// `Pong` message type id (ETP 1.2).
pub const PONG: u16 = 11;

/// A protocol a peer offers or accepts during negotiation.
///
/// Equality for dedup purposes is the `(protocol, role)` pair, exposed as
/// [`SupportedProtocol::key`]; the full record also carries the agreed wire
/// version and the per-protocol capability map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedProtocol {
    /// Numeric protocol id.
    pub protocol: ProtocolId,
    /// Wire version the peer speaks for this protocol.
    pub protocol_version: VersionRecord,
    /// The role the advertising peer plays.
    pub role: Role,
    /// Published capability record.
    pub protocol_capabilities: Capabilities,
}

impl SupportedProtocol {
    /// Builds an entry with empty capabilities.
    pub fn new(protocol: ProtocolId, version: EtpVersion, role: Role) -> Self {
        Self {
            protocol,
            protocol_version: version.record(),
            role,
            protocol_capabilities: Capabilities::new(),
        }
    }

    /// The identity used for dedup and intersection.
    pub fn key(&self) -> (ProtocolId, Role) {
        (self.protocol, self.role)
    }

    /// Removes entries whose `(protocol, role)` repeats, keeping the first.
    pub fn dedup(entries: Vec<SupportedProtocol>) -> Vec<SupportedProtocol> {
        let mut seen = std::collections::HashSet::new();
        entries
            .into_iter()
            .filter(|entry| seen.insert(entry.key()))
            .collect()
    }
}

/// Customer → store: opens negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSession {
    /// Name of the requesting application.
    pub application_name: String,
    /// Version of the requesting application.
    pub application_version: String,
    /// The `(protocol, version, role)` tuples the customer wants to use.
    pub requested_protocols: Vec<SupportedProtocol>,
}

/// Store → customer: accepts negotiation and assigns the session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSession {
    /// Server-assigned session id (UUID-shaped string).
    pub session_id: String,
    /// The intersection the store accepted, from the store's perspective.
    pub supported_protocols: Vec<SupportedProtocol>,
}

/// Either side: terminates the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSession {
    /// Human-readable reason.
    pub reason: String,
}

/// Error reply, valid on every protocol as message type 1000.
///
/// The optional `errors` map is the ETP 1.2 per-request error collection
/// keyed by sub-id; 1.1 sessions leave it `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolException {
    /// Numeric error code; see [`crate::ErrorCode`] for the closed set.
    pub error_code: i32,
    /// Human-readable description.
    pub error_message: String,
    /// Per-request error collection (ETP 1.2).
    pub errors: Option<HashMap<String, ErrorInfo>>,
}

impl ProtocolException {
    /// Builds an exception from a single error entry.
    pub fn from_info(info: &ErrorInfo) -> Self {
        Self {
            error_code: info.code,
            error_message: info.message.clone(),
            errors: None,
        }
    }

    /// The exception as a single error entry.
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.error_code,
            message: self.error_message.clone(),
        }
    }
}

/// Keep-alive probe (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    /// Sender timestamp, microseconds since the Unix epoch.
    pub current_date_time: i64,
}

/// Keep-alive answer (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pong {
    /// Sender timestamp, microseconds since the Unix epoch.
    pub current_date_time: i64,
}
