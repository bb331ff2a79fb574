//! Wire versions and protocol roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The ETP wire versions supported side-by-side by this SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EtpVersion {
    /// ETP 1.1.
    V11,
    /// ETP 1.2.
    V12,
}

impl EtpVersion {
    /// Returns the version as the four-component record advertised during
    /// negotiation.
    pub const fn record(self) -> VersionRecord {
        match self {
            Self::V11 => VersionRecord {
                major: 1,
                minor: 1,
                revision: 0,
                patch: 0,
            },
            Self::V12 => VersionRecord {
                major: 1,
                minor: 2,
                revision: 0,
                patch: 0,
            },
        }
    }

    /// Resolves a negotiation record back to a supported version, if any.
    pub fn from_record(record: &VersionRecord) -> Option<Self> {
        match (record.major, record.minor) {
            (1, 1) => Some(Self::V11),
            (1, 2) => Some(Self::V12),
            _ => None,
        }
    }
}

impl fmt::Display for EtpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V11 => f.write_str("1.1"),
            Self::V12 => f.write_str("1.2"),
        }
    }
}

/// Four-component protocol version record exchanged during negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    /// Major version.
    pub major: i32,
    /// Minor version.
    pub minor: i32,
    /// Revision.
    pub revision: i32,
    /// Patch level.
    pub patch: i32,
}

/// The side of a protocol a peer plays.
///
/// Serialized as a lowercase string in the JSON framing and as a union index
/// in the binary framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Requests and consumes data objects.
    Customer,
    /// Serves data objects.
    Store,
    /// Produces channel data.
    Producer,
    /// Consumes channel data.
    Consumer,
}

impl Role {
    /// The role the remote peer plays when the local peer plays `self`.
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Customer => Self::Store,
            Self::Store => Self::Customer,
            Self::Producer => Self::Consumer,
            Self::Consumer => Self::Producer,
        }
    }

    /// Lowercase wire name of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Store => "store",
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
