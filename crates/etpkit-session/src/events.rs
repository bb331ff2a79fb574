//! Multicast event lists.
//!
//! Handlers expose their typed events as [`EventListeners`]: a list of
//! subscribers invoked synchronously on the dispatch task, in subscription
//! order. Subscribing returns a token for unsubscription.
//!
//! Delivery holds the subscriber list lock, so a callback must not subscribe,
//! unsubscribe, or emit on the same list, and should not issue reentrant
//! sends on its own protocol.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Token returned by [`EventListeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// A list of subscribers for one event type.
pub struct EventListeners<T> {
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for EventListeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventListeners<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Adds a subscriber; the token unsubscribes it later.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, Box::new(callback)));
        SubscriptionToken(id)
    }

    /// Removes a subscriber. Returns `false` if the token was already gone.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != token.0);
        subscribers.len() != before
    }

    /// Delivers an event to every subscriber, in subscription order.
    pub fn emit(&self, event: &T) {
        for (_, callback) in self.subscribers.lock().iter() {
            callback(event);
        }
    }

    /// Number of active subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for EventListeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("subscribers", &self.len())
            .finish()
    }
}
