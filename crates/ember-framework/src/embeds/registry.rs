use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use ember_core::{
    BoxedGateway, ChannelId, EventHub, MessageDelete, MessageId, ReactionAdd, Subscription, UserId,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use super::session::EmbedSession;

pub(super) struct RegistryInner {
    gateway: BoxedGateway,
    sessions: Mutex<HashMap<MessageId, EmbedSession>>,
}

impl RegistryInner {
    pub(super) fn insert(&self, message: MessageId, session: EmbedSession) {
        self.sessions.lock().insert(message, session);
    }
}

/// What happened to an inbound reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// Not on a session message, or added by the bot itself.
    Ignored,
    /// Added by someone other than the session user, and removed.
    Stripped,
    /// Dispatched to this many option handlers of the current page.
    Handled(usize),
}

/// Tracks live embed sessions by message id.
///
/// Build one per bot and [`attach`](Self::attach) it to the gateway's event
/// hub; independent registries never see each other's sessions.
#[derive(Clone)]
pub struct EmbedRegistry {
    inner: Arc<RegistryInner>,
}

impl EmbedRegistry {
    pub fn new(gateway: BoxedGateway) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                gateway,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a session sending to `target` and driven by `user`.
    pub fn session(&self, target: ChannelId, user: UserId) -> EmbedSession {
        EmbedSession::new(
            target,
            user,
            Arc::clone(&self.inner.gateway),
            Arc::downgrade(&self.inner),
        )
    }

    /// Subscribes to reaction-add and message-delete events on `hub`.
    ///
    /// Reactions are handled on tasks spawned onto the runtime current at
    /// this call, so the hub may publish from any thread. Outside a runtime
    /// the runtime current at each event is used instead. The listeners hold
    /// the registry weakly and go quiet once it is dropped.
    pub fn attach(&self, hub: &EventHub) -> Vec<Subscription> {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            debug!("Embed registry attached outside a runtime");
        }

        let weak = Arc::downgrade(&self.inner);
        let reactions = hub.on::<ReactionAdd, _>(move |reaction| {
            let Some(registry) = upgrade(&weak) else {
                return;
            };
            let Some(runtime) = runtime.clone().or_else(|| Handle::try_current().ok()) else {
                warn!(message = %reaction.message_id, "No async runtime, dropping reaction event");
                return;
            };
            let reaction = reaction.clone();
            runtime.spawn(async move {
                registry.handle_reaction(reaction).await;
            });
        });

        let weak = Arc::downgrade(&self.inner);
        let deletes = hub.on::<MessageDelete, _>(move |event| {
            if let Some(registry) = upgrade(&weak) {
                registry.handle_delete(event);
            }
        });

        vec![reactions, deletes]
    }

    /// Routes a reaction to the session it belongs to.
    pub async fn handle_reaction(&self, reaction: ReactionAdd) -> ReactionOutcome {
        let gateway = &self.inner.gateway;
        if reaction.user_id == gateway.current_user().id {
            return ReactionOutcome::Ignored;
        }

        // Inspect under the registry lock so a concurrent delete cannot
        // evict the session halfway through.
        let dispatch = {
            let sessions = self.inner.sessions.lock();
            let Some(session) = sessions.get(&reaction.message_id) else {
                return ReactionOutcome::Ignored;
            };
            (session.user() == reaction.user_id)
                .then(|| (session.clone(), session.current_handlers(&reaction.emoji)))
        };

        let Some((session, handlers)) = dispatch else {
            debug!(
                message = %reaction.message_id,
                user = %reaction.user_id,
                "Stripping reaction from non-owner"
            );
            if let Err(err) = gateway
                .remove_reaction(
                    reaction.channel_id,
                    reaction.message_id,
                    &reaction.emoji,
                    reaction.user_id,
                )
                .await
            {
                warn!(error = %err, "Failed to strip reaction");
            }
            return ReactionOutcome::Stripped;
        };

        let count = handlers.len();
        trace!(message = %reaction.message_id, emoji = %reaction.emoji, handlers = count, "Dispatching reaction");
        for handler in handlers {
            if let Err(err) = handler(session.clone(), reaction.clone()).await {
                warn!(message = %reaction.message_id, error = %err, "Embed option handler failed");
            }
        }
        ReactionOutcome::Handled(count)
    }

    /// Forgets the session of a deleted message. Returns whether one existed.
    pub fn handle_delete(&self, event: &MessageDelete) -> bool {
        let removed = self.inner.sessions.lock().remove(&event.id).is_some();
        if removed {
            debug!(message = %event.id, "Embed session closed");
        }
        removed
    }

    pub fn get(&self, message: MessageId) -> Option<EmbedSession> {
        self.inner.sessions.lock().get(&message).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every session.
    pub fn clear(&self) {
        self.inner.sessions.lock().clear();
    }
}

fn upgrade(weak: &Weak<RegistryInner>) -> Option<EmbedRegistry> {
    weak.upgrade().map(|inner| EmbedRegistry { inner })
}

impl fmt::Debug for EmbedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
