//! # etpkit Protocol
//!
//! Protocol-level building blocks for the Energistics Transfer Protocol (ETP):
//! message headers, protocol/role/version identifiers, the per-version message
//! catalogs, the typed record bodies for the Core, Store, and GrowingObject
//! protocols, capability records, and the unified error model.
//!
//! This crate is wire-format agnostic. Encoding and decoding of the records it
//! defines (Avro-binary and JSON framings) lives in `etpkit-wire`; session
//! state, dispatch, and correlation live in `etpkit-session`.
//!
//! ## Version Support
//!
//! Two wire versions are supported side-by-side:
//!
//! | Version | Catalog | Notes |
//! |---------|---------|-------|
//! | **ETP 1.1** | [`MessageCatalog::for_version`] with [`EtpVersion::V11`] | Singular Store/GrowingObject operations |
//! | **ETP 1.2** | [`MessageCatalog::for_version`] with [`EtpVersion::V12`] | Plural operations, inherently multipart responses, per-request error collections, Core Ping/Pong |
//!
//! The header shape, flags, error codes, and negotiation records are shared by
//! both versions; only the catalogs and a handful of record bodies differ.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod capabilities;
pub mod catalog;
pub mod error;
pub mod header;
pub mod types;
pub mod version;

pub use capabilities::{Capabilities, DataValue};
pub use catalog::{MessageCatalog, MessageDescriptor, MessageDirection, PROTOCOL_EXCEPTION};
pub use error::{ErrorCode, ErrorInfo, EtpError, EtpResult};
pub use header::{MessageFlags, MessageHeader, ProtocolId};
pub use types::core::SupportedProtocol;
pub use version::{EtpVersion, Role, VersionRecord};
