//! One-shot correlation with future events.
//!
//! [`wait_for`] lets a handler pause until a later event satisfies a
//! predicate, typically a reply from the same user:
//!
//! ```rust,ignore
//! let author = ctx.author().id;
//! let channel = ctx.channel_id();
//! let reply = wait_for::<Message, _>(ctx.gateway().events(), move |m| {
//!     m.author.id == author && m.channel_id == channel
//! })
//! .recv_timeout(Duration::from_secs(30))
//! .await;
//! ```
//!
//! The listener detaches itself before the matching event is handed over, so
//! at most one event is ever delivered. A waiter whose predicate never
//! matches stays registered until [`Waiter::cancel`] is called or a timed
//! receive gives up; dropping the waiter alone does not unregister it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use ember_core::{EventHub, GatewayEvent, Subscription, TypedEvent};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

/// A pending wait for one event of type `E`.
///
/// Awaiting the waiter yields the event, or `None` once it was cancelled.
#[derive(Debug)]
pub struct Waiter<E> {
    rx: oneshot::Receiver<E>,
    subscription: Subscription,
}

/// Registers a waiter for the first `E` that satisfies `predicate`.
pub fn wait_for<E, P>(hub: &EventHub, predicate: P) -> Waiter<E>
where
    E: TypedEvent,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));

    let subscription = hub.subscribe_with(E::KIND, move |handle: Subscription| {
        move |event: &GatewayEvent| {
            let Some(payload) = E::from_event(event) else {
                return;
            };
            if !predicate(payload) {
                return;
            }
            let Some(tx) = slot.lock().take() else {
                return;
            };
            handle.detach();
            if tx.send(payload.clone()).is_err() {
                trace!(kind = %E::KIND, "Waiter matched after its receiver was dropped");
            }
        }
    });
    trace!(kind = %E::KIND, "Waiting for event");

    Waiter { rx, subscription }
}

impl<E> Waiter<E> {
    /// Waits for the event.
    pub async fn recv(self) -> Option<E> {
        self.await
    }

    /// Waits for the event at most `timeout`, unregistering on expiry.
    ///
    /// An event that matched right as the deadline passed is still returned.
    pub async fn recv_timeout(mut self, timeout: Duration) -> Option<E> {
        match tokio::time::timeout(timeout, &mut self).await {
            Ok(event) => event,
            Err(_) => self.expire(),
        }
    }

    /// Unregisters the listener and returns an event that already arrived.
    fn expire(mut self) -> Option<E> {
        self.subscription.detach();
        self.try_recv()
    }

    /// Returns the event if it has already arrived.
    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Unregisters the listener; a pending receive then yields `None`.
    pub fn cancel(&self) {
        if self.subscription.detach() {
            trace!("Waiter cancelled");
        }
    }

    /// Whether the listener is still waiting for a match.
    pub fn is_pending(&self) -> bool {
        self.subscription.is_attached()
    }
}

impl<E> Future for Waiter<E> {
    type Output = Option<E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}
