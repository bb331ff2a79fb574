//! Store protocol (id 4) records.
//!
//! ETP 1.1 uses singular operations (`GetObject` answered by `Object`); 1.2
//! moved to plural operations with inherently multipart responses. Message
//! type ids overlap between the versions, so the session's negotiated version
//! selects which record a given id decodes to.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// `GetObject` (1.1) / `GetDataObjects` (1.2) message type id.
pub const GET_OBJECT: u16 = 1;
/// `PutObject` (1.1) / `PutDataObjects` (1.2) message type id.
pub const PUT_OBJECT: u16 = 2;
/// `DeleteObject` (1.1) / `DeleteDataObjects` (1.2) message type id.
pub const DELETE_OBJECT: u16 = 3;
/// `Object` (1.1) / `GetDataObjectsResponse` (1.2) message type id.
pub const OBJECT: u16 = 4;

/// A data object payload: an opaque body plus the addressing metadata the
/// store core needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObject {
    /// Object URI in the store's namespace.
    pub uri: String,
    /// MIME type of `data`.
    pub content_type: String,
    /// The serialized object.
    pub data: Bytes,
}

/// Customer → store: fetch one object by URI (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetObject {
    /// Object URI.
    pub uri: String,
}

/// Customer → store: create or update one object (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutObject {
    /// The object to store.
    pub data_object: DataObject,
}

/// Customer → store: delete one object by URI (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObject {
    /// Object URI.
    pub uri: String,
}

/// Store → customer: one object, replying to a get (ETP 1.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// The requested object.
    pub data_object: DataObject,
}

/// Customer → store: fetch objects by URI (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDataObjects {
    /// Object URIs.
    pub uris: Vec<String>,
}

/// Customer → store: create or update objects (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutDataObjects {
    /// The objects to store.
    pub data_objects: Vec<DataObject>,
}

/// Customer → store: delete objects by URI (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDataObjects {
    /// Object URIs.
    pub uris: Vec<String>,
}

/// Store → customer: one part of an inherently multipart get response
/// (ETP 1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDataObjectsResponse {
    /// Objects carried by this part.
    pub data_objects: Vec<DataObject>,
}
