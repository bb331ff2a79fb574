//! # etpkit Wire Format Codecs
//!
//! Encoding and decoding of ETP messages in the two supported framings:
//!
//! - **Binary**: the Avro-binary encoding of the message header immediately
//!   followed by the Avro-binary encoding of the body, in one binary frame.
//!   There is no length prefix between the two; the header's self-delimiting
//!   encoding bounds it.
//! - **JSON**: a text frame containing a JSON array of exactly two elements,
//!   `[header, body]`.
//!
//! The Avro-binary layer is implemented as a serde serializer/deserializer
//! ([`avro`]): the Rust record types in `etpkit-protocol` *are* the schemas,
//! with field declaration order as wire order. Body decoding is deferred:
//! [`FrameCodec::decode`] returns the header plus an [`InboundBody`] that the
//! receiving handler decodes once the header has selected the record type.
//!
//! ## Usage
//!
//! ```rust
//! use etpkit_protocol::{MessageHeader, ProtocolId};
//! use etpkit_protocol::types::store::GetObject;
//! use etpkit_wire::{FrameCodec, MessageEncoding};
//!
//! let codec = FrameCodec::new(MessageEncoding::Binary);
//! let mut header = MessageHeader::request(ProtocolId::STORE, 1);
//! header.message_id = 1;
//! let body = GetObject { uri: "eml://well/1".into() };
//!
//! let frame = codec.encode(&header, &body).unwrap();
//! let (decoded_header, inbound) = codec.decode(&frame).unwrap();
//! assert_eq!(decoded_header, header);
//! assert_eq!(inbound.decode::<GetObject>().unwrap(), body);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod avro;
mod error;
mod framing;

pub use error::{CodecError, CodecResult};
pub use framing::{FrameCodec, InboundBody, MessageEncoding};
