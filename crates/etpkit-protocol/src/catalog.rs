//! Per-version message catalogs.
//!
//! A catalog is the static mapping from `(protocol, messageType)` to the
//! record that position carries, plus direction and multipart hints. Each
//! version's table is a single declaration site; lookups are O(1) hash probes
//! against a table built once per process.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::header::ProtocolId;
use crate::types::{core, growing_object as go, store};
use crate::version::EtpVersion;

/// `ProtocolException` message type id, valid on every protocol.
pub const MESSAGE_TYPE_PROTOCOL_EXCEPTION: u16 = 1000;

/// How a message participates in an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Initiates an exchange; sent with `correlationId = 0`.
    Request,
    /// Replies to a request; correlated to it.
    Response,
    /// Unsolicited, uncorrelated.
    Notification,
    /// Sent by either side in either position.
    Bidirectional,
}

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct MessageDescriptor {
    /// Protocol namespace of the message.
    pub protocol: ProtocolId,
    /// Message type id within the protocol.
    pub message_type: u16,
    /// Record name, for logs and diagnostics.
    pub name: &'static str,
    /// Exchange direction.
    pub direction: MessageDirection,
    /// Whether responses to this message are inherently multipart.
    pub multipart_response: bool,
}

/// The protocol-independent `ProtocolException` descriptor.
pub static PROTOCOL_EXCEPTION: MessageDescriptor = MessageDescriptor {
    protocol: ProtocolId::CORE,
    message_type: MESSAGE_TYPE_PROTOCOL_EXCEPTION,
    name: "ProtocolException",
    direction: MessageDirection::Response,
    multipart_response: false,
};

macro_rules! catalog_table {
    ($( $protocol:expr, $message_type:expr, $name:literal, $direction:ident, $multipart:expr; )*) => {
        &[
            $(MessageDescriptor {
                protocol: $protocol,
                message_type: $message_type,
                name: $name,
                direction: MessageDirection::$direction,
                multipart_response: $multipart,
            },)*
        ]
    };
}

static V11_MESSAGES: &[MessageDescriptor] = catalog_table![
    // Core
    ProtocolId::CORE, core::REQUEST_SESSION, "RequestSession", Request, false;
    ProtocolId::CORE, core::OPEN_SESSION, "OpenSession", Response, false;
    ProtocolId::CORE, core::CLOSE_SESSION, "CloseSession", Notification, false;
    // Store
    ProtocolId::STORE, store::GET_OBJECT, "GetObject", Request, true;
    ProtocolId::STORE, store::PUT_OBJECT, "PutObject", Request, false;
    ProtocolId::STORE, store::DELETE_OBJECT, "DeleteObject", Request, false;
    ProtocolId::STORE, store::OBJECT, "Object", Response, false;
    // GrowingObject
    ProtocolId::GROWING_OBJECT, go::GROWING_OBJECT_GET, "GrowingObjectGet", Request, true;
    ProtocolId::GROWING_OBJECT, go::GROWING_OBJECT_GET_RANGE, "GrowingObjectGetRange", Request, true;
    ProtocolId::GROWING_OBJECT, go::GROWING_OBJECT_PUT, "GrowingObjectPut", Request, false;
    ProtocolId::GROWING_OBJECT, go::GROWING_OBJECT_DELETE, "GrowingObjectDelete", Request, false;
    ProtocolId::GROWING_OBJECT, go::GROWING_OBJECT_DELETE_RANGE, "GrowingObjectDeleteRange", Request, false;
    ProtocolId::GROWING_OBJECT, go::OBJECT_FRAGMENT, "ObjectFragment", Response, true;
];

static V12_MESSAGES: &[MessageDescriptor] = catalog_table![
    // Core
    ProtocolId::CORE, core::REQUEST_SESSION, "RequestSession", Request, false;
    ProtocolId::CORE, core::OPEN_SESSION, "OpenSession", Response, false;
    ProtocolId::CORE, core::CLOSE_SESSION, "CloseSession", Notification, false;
    ProtocolId::CORE, core::PING, "Ping", Request, false;
    ProtocolId::CORE, core::PONG, "Pong", Response, false;
    // Store
    ProtocolId::STORE, store::GET_OBJECT, "GetDataObjects", Request, true;
    ProtocolId::STORE, store::PUT_OBJECT, "PutDataObjects", Request, false;
    ProtocolId::STORE, store::DELETE_OBJECT, "DeleteDataObjects", Request, false;
    ProtocolId::STORE, store::OBJECT, "GetDataObjectsResponse", Response, true;
    // GrowingObject
    ProtocolId::GROWING_OBJECT, go::DELETE_PARTS, "DeleteParts", Request, false;
    ProtocolId::GROWING_OBJECT, go::DELETE_PARTS_BY_RANGE, "DeletePartsByRange", Request, false;
    ProtocolId::GROWING_OBJECT, go::GET_PARTS, "GetParts", Request, true;
    ProtocolId::GROWING_OBJECT, go::GET_PARTS_BY_RANGE, "GetPartsByRange", Request, true;
    ProtocolId::GROWING_OBJECT, go::PUT_PARTS, "PutParts", Request, false;
    ProtocolId::GROWING_OBJECT, go::GET_PARTS_RESPONSE, "GetPartsResponse", Response, true;
    ProtocolId::GROWING_OBJECT, go::REPLACE_PARTS_BY_RANGE, "ReplacePartsByRange", Request, false;
];

/// A version's `(protocol, messageType) → descriptor` table.
#[derive(Debug)]
pub struct MessageCatalog {
    version: EtpVersion,
    by_key: HashMap<(u16, u16), &'static MessageDescriptor>,
}

static V11_CATALOG: LazyLock<MessageCatalog> =
    LazyLock::new(|| MessageCatalog::build(EtpVersion::V11, V11_MESSAGES));
static V12_CATALOG: LazyLock<MessageCatalog> =
    LazyLock::new(|| MessageCatalog::build(EtpVersion::V12, V12_MESSAGES));

impl MessageCatalog {
    fn build(version: EtpVersion, messages: &'static [MessageDescriptor]) -> Self {
        let mut by_key = HashMap::with_capacity(messages.len());
        for descriptor in messages {
            let previous =
                by_key.insert((descriptor.protocol.0, descriptor.message_type), descriptor);
            debug_assert!(previous.is_none(), "duplicate catalog entry {}", descriptor.name);
        }
        Self { version, by_key }
    }

    /// The catalog for a wire version.
    pub fn for_version(version: EtpVersion) -> &'static MessageCatalog {
        match version {
            EtpVersion::V11 => &V11_CATALOG,
            EtpVersion::V12 => &V12_CATALOG,
        }
    }

    /// The version this catalog describes.
    pub const fn version(&self) -> EtpVersion {
        self.version
    }

    /// Looks up the descriptor for a `(protocol, messageType)` pair.
    ///
    /// Message type 1000 resolves to [`PROTOCOL_EXCEPTION`] on every
    /// protocol.
    pub fn lookup(&self, protocol: ProtocolId, message_type: u16) -> Option<&'static MessageDescriptor> {
        if message_type == MESSAGE_TYPE_PROTOCOL_EXCEPTION {
            return Some(&PROTOCOL_EXCEPTION);
        }
        self.by_key.get(&(protocol.0, message_type)).copied()
    }

    /// Returns `true` if responses to `(protocol, messageType)` are
    /// inherently multipart in this version.
    pub fn is_multipart_response(&self, protocol: ProtocolId, message_type: u16) -> bool {
        self.lookup(protocol, message_type)
            .is_some_and(|descriptor| descriptor.multipart_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_version_scoped() {
        let v11 = MessageCatalog::for_version(EtpVersion::V11);
        let v12 = MessageCatalog::for_version(EtpVersion::V12);

        assert_eq!(
            v11.lookup(ProtocolId::STORE, store::GET_OBJECT).unwrap().name,
            "GetObject"
        );
        assert_eq!(
            v12.lookup(ProtocolId::STORE, store::GET_OBJECT).unwrap().name,
            "GetDataObjects"
        );
        // ReplacePartsByRange exists only in 1.2.
        assert!(
            v11.lookup(ProtocolId::GROWING_OBJECT, go::REPLACE_PARTS_BY_RANGE)
                .is_none()
        );
        assert!(
            v12.lookup(ProtocolId::GROWING_OBJECT, go::REPLACE_PARTS_BY_RANGE)
                .is_some()
        );
    }

    #[test]
    fn protocol_exception_resolves_on_every_protocol() {
        let catalog = MessageCatalog::for_version(EtpVersion::V11);
        for protocol in [ProtocolId::CORE, ProtocolId::STORE, ProtocolId(99)] {
            let descriptor = catalog
                .lookup(protocol, MESSAGE_TYPE_PROTOCOL_EXCEPTION)
                .unwrap();
            assert_eq!(descriptor.name, "ProtocolException");
        }
    }

    #[test]
    fn unknown_pairs_miss() {
        let catalog = MessageCatalog::for_version(EtpVersion::V11);
        assert!(catalog.lookup(ProtocolId::STORE, 99).is_none());
        assert!(catalog.lookup(ProtocolId(99), 1).is_none());
        // Ping is 1.2-only.
        assert!(catalog.lookup(ProtocolId::CORE, core::PING).is_none());
    }

    #[test]
    fn multipart_hints_differ_between_versions() {
        let v11 = MessageCatalog::for_version(EtpVersion::V11);
        let v12 = MessageCatalog::for_version(EtpVersion::V12);
        assert!(v11.is_multipart_response(ProtocolId::STORE, store::GET_OBJECT));
        assert!(v12.is_multipart_response(ProtocolId::STORE, store::GET_OBJECT));
        assert!(!v11.is_multipart_response(ProtocolId::STORE, store::PUT_OBJECT));
        // GetParts (1.2) reuses GrowingObjectPut's id (1.1); only 1.2 treats
        // it as a multipart-response request.
        assert!(!v11.is_multipart_response(ProtocolId::GROWING_OBJECT, go::GROWING_OBJECT_PUT));
        assert!(v12.is_multipart_response(ProtocolId::GROWING_OBJECT, go::GET_PARTS));
    }
}
