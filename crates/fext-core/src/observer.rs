//! Listener registry and broadcast fan-out for control events
//!
//! A control owns one [`EventBus`] and calls [`EventBus::emit`] at each
//! emission point. Delivery happens two ways:
//!
//! - registered [`Listener`]s are invoked synchronously, in registration
//!   order, before `emit` returns;
//! - async consumers call [`EventBus::subscribe`] and receive a clone of
//!   every event through a `tokio::sync::broadcast` channel.
//!
//! Each listener sees events in emission order. Listeners must not call back
//! into the emitting control from `on_event`: controls emit while holding
//! their state lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Default capacity of the broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Callback invoked for every event emitted on a bus
pub trait Listener<E>: Send + Sync {
    fn on_event(&self, event: &E);
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event)
    }
}

/// Handle returned by [`EventBus::add_listener`], used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry plus broadcast channel for one control
pub struct EventBus<E: Clone> {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn Listener<E>>)>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            tx,
        }
    }

    /// Register a synchronous listener
    pub fn add_listener(&self, listener: impl Listener<E> + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Returns false if the id was unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Subscribe to events through the broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Deliver an event to every listener, then to broadcast subscribers
    pub fn emit(&self, event: E) {
        // Snapshot so a listener may register or remove listeners without
        // deadlocking on the registry lock.
        let listeners: Vec<Arc<dyn Listener<E>>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in &listeners {
            listener.on_event(&event);
        }

        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
