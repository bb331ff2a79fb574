//! GrowingObject protocol (id 6) records.
//!
//! Growing objects accumulate list-like parts over time (log curves,
//! trajectory stations). Range operations address parts through
//! [`RangeEndpoint`]s: a discriminated union over numeric, time, or index
//! values annotated with a unit of measure and an optional depth datum, both
//! of which must survive the wire unchanged.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// `GrowingObjectGet` (1.1) / `DeleteParts` (1.2) message type id.
pub const GROWING_OBJECT_GET: u16 = 1;
/// `GrowingObjectGetRange` (1.1) / `DeletePartsByRange` (1.2) message type id.
pub const GROWING_OBJECT_GET_RANGE: u16 = 2;
/// `GrowingObjectPut` (1.1) / `GetParts` (1.2) message type id.
pub const GROWING_OBJECT_PUT: u16 = 3;
/// `GrowingObjectDelete` (1.1) / `GetPartsByRange` (1.2) message type id.
pub const GROWING_OBJECT_DELETE: u16 = 4;
/// `GrowingObjectDeleteRange` (1.1) / `PutParts` (1.2) message type id.
pub const GROWING_OBJECT_DELETE_RANGE: u16 = 5;
/// `ObjectFragment` (1.1) / `GetPartsResponse` (1.2) message type id.
pub const OBJECT_FRAGMENT: u16 = 6;
/// `ReplacePartsByRange` (1.2) message type id.
pub const REPLACE_PARTS_BY_RANGE: u16 = 7;

/// `DeleteParts` (1.2) message type id.
pub const DELETE_PARTS: u16 = GROWING_OBJECT_GET;
/// `DeletePartsByRange` (1.2) message type id.
pub const DELETE_PARTS_BY_RANGE: u16 = GROWING_OBJECT_GET_RANGE;
/// `GetParts` (1.2) message type id.
pub const GET_PARTS: u16 = GROWING_OBJECT_PUT;
/// `GetPartsByRange` (1.2) message type id.
pub const GET_PARTS_BY_RANGE: u16 = GROWING_OBJECT_DELETE;
/// `PutParts` (1.2) message type id.
pub const PUT_PARTS: u16 = GROWING_OBJECT_DELETE_RANGE;
/// `GetPartsResponse` (1.2) message type id.
pub const GET_PARTS_RESPONSE: u16 = OBJECT_FRAGMENT;

/// The value of a range endpoint: numeric depth, floating index, or a
/// timestamp in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    /// Integral index (for example a measured-depth tenthfoot count).
    Long(i64),
    /// Floating-point index.
    Double(f64),
    /// Time index, microseconds since the Unix epoch.
    Timestamp(i64),
}

/// One end of a part range, with its on-the-wire annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeEndpoint {
    /// The endpoint value.
    pub value: IndexValue,
    /// Unit of measure of `value`.
    pub uom: String,
    /// Depth datum the value is referenced to, when depth-based.
    pub depth_datum: Option<String>,
}

impl RangeEndpoint {
    /// Builds an endpoint without a depth datum.
    pub fn new(value: IndexValue, uom: impl Into<String>) -> Self {
        Self {
            value,
            uom: uom.into(),
            depth_datum: None,
        }
    }
}

/// An inclusive part range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRange {
    /// Range start.
    pub start: RangeEndpoint,
    /// Range end.
    pub end: RangeEndpoint,
}

/// One part of a growing object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPart {
    /// Part uid, unique within the parent object.
    pub uid: String,
    /// MIME type of `data`.
    pub content_type: String,
    /// The serialized part.
    pub data: Bytes,
}

/// Customer → store: fetch all parts of one object (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingObjectGet {
    /// Parent object URI.
    pub uri: String,
}

/// Customer → store: fetch the parts within a range (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingObjectGetRange {
    /// Parent object URI.
    pub uri: String,
    /// Range to fetch.
    pub range: IndexRange,
}

/// Customer → store: add or update one part (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingObjectPut {
    /// Parent object URI.
    pub uri: String,
    /// The part to store.
    pub part: ObjectPart,
}

/// Customer → store: delete one part by uid (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingObjectDelete {
    /// Parent object URI.
    pub uri: String,
    /// Uid of the part to delete.
    pub uid: String,
}

/// Customer → store: delete the parts within a range (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingObjectDeleteRange {
    /// Parent object URI.
    pub uri: String,
    /// Range to delete.
    pub range: IndexRange,
}

/// Store → customer: one part of a multipart get response (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFragment {
    /// Parent object URI.
    pub uri: String,
    /// MIME type of `data`.
    pub content_type: String,
    /// The serialized part.
    pub data: Bytes,
}

/// Customer → store: fetch parts by uid (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParts {
    /// Parent object URI.
    pub uri: String,
    /// Uids to fetch; empty means all parts.
    pub uids: Vec<String>,
}

/// Customer → store: fetch the parts within a range (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPartsByRange {
    /// Parent object URI.
    pub uri: String,
    /// Range to fetch.
    pub range: IndexRange,
}

/// Customer → store: add or update parts (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutParts {
    /// Parent object URI.
    pub uri: String,
    /// Parts to store.
    pub parts: Vec<ObjectPart>,
}

/// Customer → store: delete parts by uid (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParts {
    /// Parent object URI.
    pub uri: String,
    /// Uids to delete.
    pub uids: Vec<String>,
}

/// Customer → store: delete the parts within a range (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePartsByRange {
    /// Parent object URI.
    pub uri: String,
    /// Range to delete.
    pub range: IndexRange,
}

/// Customer → store: atomically replace the parts within a range (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacePartsByRange {
    /// Parent object URI.
    pub uri: String,
    /// Range whose current parts are removed.
    pub delete_range: IndexRange,
    /// Replacement parts.
    pub parts: Vec<ObjectPart>,
}

/// Store → customer: one part of an inherently multipart get response
/// (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPartsResponse {
    /// Parent object URI.
    pub uri: String,
    /// Parts carried by this part of the response set.
    pub parts: Vec<ObjectPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_annotations_survive_json() {
        let range = IndexRange {
            start: RangeEndpoint {
                value: IndexValue::Double(1500.5),
                uom: "m".into(),
                depth_datum: Some("KB".into()),
            },
            end: RangeEndpoint::new(IndexValue::Timestamp(1_700_000_000_000_000), "us"),
        };
        let json = serde_json::to_string(&range).unwrap();
        let back: IndexRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
        assert_eq!(back.start.depth_datum.as_deref(), Some("KB"));
    }

    #[test]
    fn index_value_variants_are_distinct() {
        let long = serde_json::to_value(IndexValue::Long(42)).unwrap();
        let time = serde_json::to_value(IndexValue::Timestamp(42)).unwrap();
        assert_ne!(long, time);
    }
}
