//! # etpkit WebSocket Transport
//!
//! WebSocket (RFC 6455) transport for ETP sessions, on both sides of the
//! upgrade:
//!
//! - [`connect`] opens a customer connection, requesting the `etp`
//!   subprotocol and announcing the message encoding through the
//!   `etp-encoding` header;
//! - [`accept`] upgrades an inbound store-side connection, capturing the
//!   handshake headers and latching the encoding for the session lifetime
//!   (`etp+binary` when the header is absent).
//!
//! Binary frames carry the Avro-binary framing, text frames the JSON
//! framing; ping/pong keep-alive frames are answered by the WebSocket layer
//! itself. TLS and authentication are the embedding application's concern.

#![deny(unsafe_code)]

mod client;
mod config;
mod server;
mod transport;

pub use client::connect;
pub use config::WebSocketConfig;
pub use server::{AcceptedSession, accept};
pub use transport::{ClientTransport, ServerTransport, WebSocketTransport};
