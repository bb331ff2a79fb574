//! # etpkit Session Core
//!
//! The session-and-dispatch engine every ETP protocol handler composes on:
//!
//! - monotonic message-id allocation with a session-wide send lock, so ids
//!   appear on the wire contiguous and in order;
//! - a dual-keyed [`registry::HandlerRegistry`] (contract identity for
//!   applications, protocol id for the receive path);
//! - a [`correlation::CorrelationTracker`] for in-flight requests, multipart
//!   assembly, deadlines, and completion signals;
//! - inbound routing from decoded frames to per-protocol handlers, with
//!   wire-visible failures always converted to `ProtocolException`;
//! - Core-protocol negotiation (`RequestSession`/`OpenSession`) and session
//!   lifecycle (`Negotiating → Open → Closing → Closed`).
//!
//! Concrete handlers for the Store and GrowingObject protocols live in
//! [`handlers`]; applications can add their own by implementing
//! [`ProtocolHandler`] and [`HandlerContract`].

#![deny(unsafe_code)]

pub mod correlation;
pub mod events;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod session;

pub use correlation::{AssembledPart, CorrelationOutcome, CorrelationTracker, PendingRequest};
pub use events::{EventListeners, SubscriptionToken};
pub use handler::{ExceptionReceived, HandlerDescriptor, ProtocolHandler, SessionSlot};
pub use registry::{ContractId, HandlerContract, HandlerRegistry};
pub use session::{EtpSession, SessionConfig, SessionHandle, SessionState};
