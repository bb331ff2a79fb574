//! Protocol capability records.
//!
//! Each protocol may publish a small record of known keys during negotiation.
//! Both sides read only the keys they know and ignore the rest; unknown keys
//! round-trip untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Well-known capability keys read by the session core.
pub mod keys {
    /// Maximum number of response messages a store will send per request.
    pub const MAX_RESPONSE_COUNT: &str = "MaxResponseCount";
    /// Maximum number of concurrently open transactions.
    pub const MAX_TRANSACTION_COUNT: &str = "MaxTransactionCount";
    /// Transaction idle timeout in seconds.
    pub const TRANSACTION_TIMEOUT_PERIOD: &str = "TransactionTimeoutPeriod";
    /// Maximum WebSocket frame payload the peer accepts, in bytes.
    pub const MAX_FRAME_SIZE: &str = "MaxFrameSize";
}

/// A capability value: the small union of scalar types capability records
/// carry on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// 64-bit integer.
    Long(i64),
    /// Double-precision float.
    Double(f64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 string.
    String(String),
}

impl DataValue {
    /// Returns the value as an integer, if it is one.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a boolean, if it is one.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// An open capability map with typed accessors for the known keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities(pub HashMap<String, DataValue>);

impl Capabilities {
    /// Creates an empty capability record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a capability, replacing any previous value under the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DataValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw lookup; unknown keys are simply absent.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    /// `MaxResponseCount`, if published.
    pub fn max_response_count(&self) -> Option<i64> {
        self.get(keys::MAX_RESPONSE_COUNT).and_then(DataValue::as_long)
    }

    /// `MaxTransactionCount`, if published.
    pub fn max_transaction_count(&self) -> Option<i64> {
        self.get(keys::MAX_TRANSACTION_COUNT)
            .and_then(DataValue::as_long)
    }

    /// `TransactionTimeoutPeriod` in seconds, if published.
    pub fn transaction_timeout_period(&self) -> Option<i64> {
        self.get(keys::TRANSACTION_TIMEOUT_PERIOD)
            .and_then(DataValue::as_long)
    }

    /// `MaxFrameSize` in bytes, if published.
    pub fn max_frame_size(&self) -> Option<i64> {
        self.get(keys::MAX_FRAME_SIZE).and_then(DataValue::as_long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_are_typed() {
        let mut caps = Capabilities::new();
        caps.set(keys::MAX_RESPONSE_COUNT, 100i64)
            .set(keys::MAX_FRAME_SIZE, 1_048_576i64);
        assert_eq!(caps.max_response_count(), Some(100));
        assert_eq!(caps.max_frame_size(), Some(1_048_576));
        assert_eq!(caps.max_transaction_count(), None);
    }

    #[test]
    fn unknown_keys_are_preserved_and_ignored() {
        let mut caps = Capabilities::new();
        caps.set("SomeVendorExtension", "on");
        // Unknown to the typed accessors, still present in the raw map.
        assert_eq!(caps.max_response_count(), None);
        assert_eq!(
            caps.get("SomeVendorExtension").and_then(DataValue::as_str),
            Some("on")
        );

        let json = serde_json::to_string(&caps).unwrap();
        let back: Capabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back, caps);
    }

    #[test]
    fn mistyped_known_key_reads_as_absent() {
        let mut caps = Capabilities::new();
        caps.set(keys::MAX_RESPONSE_COUNT, "not a number");
        assert_eq!(caps.max_response_count(), None);
    }
}
