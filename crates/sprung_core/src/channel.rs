//! Change notification channel
//!
//! Multi-subscriber fan-out used by spring drivers to announce new values.
//!
//! Emission iterates over a snapshot of the subscribers taken when `emit` is
//! called. Subscribing or unsubscribing from inside a callback only affects
//! later emits, and a panicking subscriber is logged and skipped without
//! stopping delivery to the rest.
//!
//! ```rust
//! use sprung_core::Channel;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let channel = Channel::<f64>::new();
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let sink = Rc::clone(&seen);
//! let subscription = channel.subscribe(move |value| sink.set(*value));
//!
//! channel.emit(&42.0);
//! assert_eq!(seen.get(), 42.0);
//!
//! subscription.unsubscribe();
//! channel.emit(&7.0);
//! assert_eq!(seen.get(), 42.0);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

new_key_type! {
    /// Identifier of a single channel subscription
    pub struct SubscriptionId;
}

type Subscriber<T> = Rc<dyn Fn(&T)>;

struct ChannelInner<T> {
    subscribers: SlotMap<SubscriptionId, Subscriber<T>>,
    /// Set by `destroy()`; a destroyed channel ignores emits and new subscribers
    destroyed: bool,
}

/// A single-threaded multi-subscriber channel
///
/// Cloning a channel yields another handle to the same subscriber set.
pub struct Channel<T> {
    inner: Rc<RefCell<ChannelInner<T>>>,
}

impl<T: 'static> Channel<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelInner {
                subscribers: SlotMap::with_key(),
                destroyed: false,
            })),
        }
    }

    /// Register a callback invoked on every future `emit`
    ///
    /// Subscribing to a destroyed channel returns an inactive subscription.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = if inner.destroyed {
            SubscriptionId::default()
        } else {
            inner.subscribers.insert(Rc::new(callback))
        };

        Subscription {
            channel: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `value` to every subscriber registered at the time of the call
    pub fn emit(&self, value: &T) {
        let snapshot: SmallVec<[Subscriber<T>; 4]> = {
            let inner = self.inner.borrow();
            if inner.destroyed {
                return;
            }
            inner.subscribers.values().cloned().collect()
        };

        for subscriber in snapshot {
            if catch_unwind(AssertUnwindSafe(|| subscriber(value))).is_err() {
                tracing::error!("Channel subscriber panicked during emit, skipping it");
            }
        }
    }

    /// Drop all subscribers; further emits become no-ops
    pub fn destroy(&self) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            inner.destroyed = true;
            std::mem::take(&mut inner.subscribers)
        };
        // Callbacks may own values whose drop re-enters the channel
        drop(removed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl<T: 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Handle returned by [`Channel::subscribe`]
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription<T> {
    channel: Weak<RefCell<ChannelInner<T>>>,
    id: SubscriptionId,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the callback from its channel
    ///
    /// Returns `false` if it was already removed or the channel is gone.
    pub fn unsubscribe(&self) -> bool {
        self.channel
            .upgrade()
            .map(|inner| {
                let removed = inner.borrow_mut().subscribers.remove(self.id);
                removed.is_some()
            })
            .unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.channel
            .upgrade()
            .map(|inner| inner.borrow().subscribers.contains_key(self.id))
            .unwrap_or(false)
    }
}
