//! Concrete protocol handlers.
//!
//! [`core::CoreHandler`] is registered automatically by every session; the
//! Store and GrowingObject handler pairs are the shipped customer/store
//! families. Applications register the side matching their session role and
//! either subscribe to the typed events or use the `*_await` helpers.

pub mod core;
pub mod growing_object;
pub mod store;

pub use self::core::CoreHandler;
pub use growing_object::{
    FragmentReceived, GrowingObjectBackend, GrowingObjectCustomerHandler,
    GrowingObjectStoreHandler,
};
pub use store::{ObjectReceived, StoreBackend, StoreCustomerHandler, StoreStoreHandler};
