//! Gateway events and the subscription hub.
//!
//! The gateway delivers a closed set of events, modelled as the
//! [`GatewayEvent`] enum. Consumers register callbacks on an [`EventHub`],
//! optionally restricted to one [`EventKind`], and get back a
//! [`Subscription`] that unregisters the callback when detached.
//!
//! ```rust,ignore
//! use ember_core::{EventHub, EventKind, GatewayEvent};
//!
//! let hub = EventHub::new();
//! let sub = hub.subscribe(EventKind::MessageCreate, |event| {
//!     if let GatewayEvent::MessageCreate(msg) = event {
//!         println!("{}", msg.content);
//!     }
//! });
//!
//! // Later:
//! sub.detach();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::model::{Message, MessageDelete, ReactionAdd, Ready};

// ============================================================================
// Event types
// ============================================================================

/// Tag identifying the kind of a [`GatewayEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    MessageCreate,
    MessageReactionAdd,
    MessageDelete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::MessageCreate => "message_create",
            Self::MessageReactionAdd => "message_reaction_add",
            Self::MessageDelete => "message_delete",
        })
    }
}

/// An event delivered by the gateway.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(Ready),
    MessageCreate(Message),
    MessageReactionAdd(ReactionAdd),
    MessageDelete(MessageDelete),
}

impl GatewayEvent {
    /// Returns the tag of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageReactionAdd(_) => EventKind::MessageReactionAdd,
            Self::MessageDelete(_) => EventKind::MessageDelete,
        }
    }
}

/// A payload type carried by exactly one [`GatewayEvent`] variant.
///
/// This lets callers ask for "the next `ReactionAdd` such that ..." and get
/// the typed payload back instead of matching on the enum themselves.
pub trait TypedEvent: Clone + Send + Sync + 'static {
    /// The variant carrying this payload.
    const KIND: EventKind;

    /// Borrows the payload if `event` is of this type.
    fn from_event(event: &GatewayEvent) -> Option<&Self>;
}

macro_rules! typed_event {
    ($ty:ty, $variant:ident) => {
        impl TypedEvent for $ty {
            const KIND: EventKind = EventKind::$variant;

            fn from_event(event: &GatewayEvent) -> Option<&Self> {
                match event {
                    GatewayEvent::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

typed_event!(Ready, Ready);
typed_event!(Message, MessageCreate);
typed_event!(ReactionAdd, MessageReactionAdd);
typed_event!(MessageDelete, MessageDelete);

// ============================================================================
// EventHub
// ============================================================================

/// A registered event callback.
pub type EventCallback = Arc<dyn Fn(&GatewayEvent) + Send + Sync>;

struct Listener {
    id: u64,
    kind: Option<EventKind>,
    callback: EventCallback,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Listener>>,
}

/// Fan-out point for gateway events.
///
/// Cloning is cheap; clones share the same listener list.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), |_| callback)
    }

    /// Registers `callback` for every event.
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.insert(None, |_| callback)
    }

    /// Registers a callback for the typed payload `E`.
    pub fn on<E, F>(&self, callback: F) -> Subscription
    where
        E: TypedEvent,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(Some(E::KIND), move |_| {
            move |event: &GatewayEvent| {
                if let Some(payload) = E::from_event(event) {
                    callback(payload);
                }
            }
        })
    }

    /// Registers a callback that needs its own [`Subscription`], for example
    /// to detach itself after the first delivery.
    ///
    /// `make` receives the handle before the callback becomes reachable, so
    /// no event can be delivered to a callback that cannot yet detach.
    pub fn subscribe_with<M, F>(&self, kind: EventKind, make: M) -> Subscription
    where
        M: FnOnce(Subscription) -> F,
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.insert(Some(kind), make)
    }

    fn insert<M, F>(&self, kind: Option<EventKind>, make: M) -> Subscription
    where
        M: FnOnce(Subscription) -> F,
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        };
        let callback: EventCallback = Arc::new(make(handle.clone()));
        self.inner.listeners.write().push(Listener {
            id,
            kind,
            callback,
        });
        trace!(listener = id, kind = ?kind, "Registered event listener");
        handle
    }

    /// Delivers `event` to every listener registered for its kind.
    ///
    /// Callbacks run outside the listener lock, so they may subscribe or
    /// detach freely. Returns the number of callbacks invoked.
    pub fn publish(&self, event: &GatewayEvent) -> usize {
        let kind = event.kind();
        let callbacks: Vec<EventCallback> = self
            .inner
            .listeners
            .read()
            .iter()
            .filter(|l| l.kind.is_none_or(|k| k == kind))
            .map(|l| Arc::clone(&l.callback))
            .collect();

        trace!(%kind, listeners = callbacks.len(), "Publishing event");
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered listener.
///
/// Dropping the handle does **not** unregister the listener; call
/// [`detach`](Self::detach).
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// Unregisters the listener. Returns `false` if it was already gone.
    pub fn detach(&self) -> bool {
        let Some(hub) = self.hub.upgrade() else {
            return false;
        };
        let mut listeners = hub.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != self.id);
        let removed = listeners.len() != before;
        if removed {
            trace!(listener = self.id, "Detached event listener");
        }
        removed
    }

    /// Whether the listener is still registered.
    pub fn is_attached(&self) -> bool {
        self.hub
            .upgrade()
            .is_some_and(|hub| hub.listeners.read().iter().any(|l| l.id == self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ChannelId, MessageId};
    use crate::model::User;
    use std::sync::atomic::AtomicUsize;

    fn message(content: &str) -> GatewayEvent {
        GatewayEvent::MessageCreate(Message {
            id: MessageId(1),
            channel_id: ChannelId(2),
            guild_id: None,
            author: User::new(3u64, "someone"),
            content: content.to_string(),
            embeds: Vec::new(),
        })
    }

    fn delete() -> GatewayEvent {
        GatewayEvent::MessageDelete(MessageDelete {
            id: MessageId(1),
            channel_id: ChannelId(2),
            guild_id: None,
        })
    }

    #[test]
    fn test_publish_filters_by_kind() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        hub.subscribe(EventKind::MessageCreate, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(hub.publish(&message("hi")), 1);
        assert_eq!(hub.publish(&delete()), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_typed_listener_receives_payload() {
        let hub = EventHub::new();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let s = Arc::clone(&seen);
        hub.on(move |msg: &Message| s.write().push(msg.content.clone()));

        hub.publish(&message("one"));
        hub.publish(&delete());
        hub.publish(&message("two"));
        assert_eq!(*seen.read(), vec!["one", "two"]);
    }

    #[test]
    fn test_detach_stops_delivery() {
        let hub = EventHub::new();
        let sub = hub.subscribe_all(|_| {});
        assert!(sub.is_attached());
        assert!(sub.detach());
        assert!(!sub.detach());
        assert_eq!(hub.publish(&message("x")), 0);
    }

    #[test]
    fn test_callback_can_detach_itself() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        hub.subscribe_with(EventKind::MessageCreate, move |me| {
            move |_: &GatewayEvent| {
                me.detach();
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        hub.publish(&message("a"));
        hub.publish(&message("b"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(hub.listener_count(), 0);
    }
}
