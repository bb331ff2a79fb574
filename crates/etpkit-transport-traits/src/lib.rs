//! Core transport abstractions for etpkit.
//!
//! A [`Transport`] moves whole frames (one ETP message per frame) between
//! peers. The session core is the single writer (serialized by its send lock)
//! and the single reader (its receive task) of a transport; implementations
//! may rely on that discipline.
//!
//! The crate also ships [`inproc::InProcTransport`], a channel-backed duplex
//! pair used by session-level tests and for wiring a store and a customer
//! inside one process.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
pub mod inproc;
mod traits;

pub use error::{TransportError, TransportResult};
pub use frame::Frame;
pub use traits::Transport;
