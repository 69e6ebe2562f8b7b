use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use ember_core::{BoxedGateway, ChannelId, Embed, Emoji, MessageEdit, MessageId, MessageSend, UserId};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::page::{OptionHandler, StatefulEmbed};
use super::registry::RegistryInner;
use crate::error::{EmbedError, EmbedResult};

/// Placeholder shown while the first page is being rendered.
pub const LOADING_TEXT: &str = "Loading...";

/// Sent when a page referenced an emoji the platform does not know.
pub const MISSING_EMOJI_NOTICE: &str = "Oops, I did not find at least one of the emojis for this \
                                        page, please review all items that should have been on here";

/// Index of a page within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(pub(crate) usize);

impl PageId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Default)]
struct SessionState {
    data: Option<Box<dyn Any + Send + Sync>>,
    message: Option<MessageId>,
    pages: Vec<StatefulEmbed>,
    current: Option<PageId>,
    /// Bumped on every render; reaction work for an older render stops.
    render: u64,
}

struct SessionInner {
    target: ChannelId,
    user: UserId,
    gateway: BoxedGateway,
    registry: Weak<RegistryInner>,
    state: Mutex<SessionState>,
    /// Serializes reaction replacement across renders.
    reactions: tokio::sync::Mutex<()>,
}

/// One interactive, reaction-driven message.
///
/// The session owns its pages; showing a page only moves the current index.
/// Only reactions from [`user`](Self::user) are honoured. Cloning yields
/// another handle to the same session.
#[derive(Clone)]
pub struct EmbedSession {
    inner: Arc<SessionInner>,
}

impl EmbedSession {
    pub(super) fn new(
        target: ChannelId,
        user: UserId,
        gateway: BoxedGateway,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                target,
                user,
                gateway,
                registry,
                state: Mutex::new(SessionState::default()),
                reactions: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Channel the session message is sent to.
    pub fn target(&self) -> ChannelId {
        self.inner.target
    }

    /// The only user whose reactions drive this session.
    pub fn user(&self) -> UserId {
        self.inner.user
    }

    /// The session message, once shown.
    pub fn message_id(&self) -> Option<MessageId> {
        self.inner.state.lock().message
    }

    pub fn current_page(&self) -> Option<PageId> {
        self.inner.state.lock().current
    }

    pub fn page_count(&self) -> usize {
        self.inner.state.lock().pages.len()
    }

    // ─── Caller data ──────────────────────────────────────────────────────────

    /// Attaches arbitrary caller data, replacing any previous value.
    pub fn set_data<T: Send + Sync + 'static>(&self, data: T) {
        self.inner.state.lock().data = Some(Box::new(data));
    }

    /// A clone of the caller data if it has type `T`.
    pub fn data<T: Clone + 'static>(&self) -> Option<T> {
        self.inner
            .state
            .lock()
            .data
            .as_ref()
            .and_then(|d| d.downcast_ref::<T>())
            .cloned()
    }

    /// Runs `f` on the caller data if it has type `T`.
    ///
    /// `f` runs under the session lock and must not call back into the session.
    pub fn update_data<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner
            .state
            .lock()
            .data
            .as_mut()
            .and_then(|d| d.downcast_mut::<T>())
            .map(f)
    }

    // ─── Pages ────────────────────────────────────────────────────────────────

    pub fn add_page(&self, page: StatefulEmbed) -> PageId {
        let mut state = self.inner.state.lock();
        state.pages.push(page);
        PageId(state.pages.len() - 1)
    }

    /// Swaps the content of an existing page. Takes effect on the next show.
    pub fn replace_page(&self, id: PageId, page: StatefulEmbed) -> EmbedResult<()> {
        let mut state = self.inner.state.lock();
        let slot = state
            .pages
            .get_mut(id.0)
            .ok_or(EmbedError::UnknownPage(id.0))?;
        *slot = page;
        Ok(())
    }

    pub fn page(&self, id: PageId) -> Option<StatefulEmbed> {
        self.inner.state.lock().pages.get(id.0).cloned()
    }

    // ─── Rendering ────────────────────────────────────────────────────────────

    /// Sends the session message, registers the session and shows the first page.
    ///
    /// A session is shown once; use [`show_page`](Self::show_page) afterwards.
    pub async fn show(&self) -> EmbedResult<()> {
        {
            let state = self.inner.state.lock();
            if state.pages.is_empty() {
                return Err(EmbedError::NoPages);
            }
            if let Some(message) = state.message {
                return Err(EmbedError::AlreadyShown(message));
            }
        }

        let placeholder = Embed::new().description(LOADING_TEXT);
        let message = self
            .inner
            .gateway
            .send_message(self.target(), MessageSend::embed(placeholder))
            .await?;
        self.inner.state.lock().message = Some(message.id);

        match self.inner.registry.upgrade() {
            Some(registry) => registry.insert(message.id, self.clone()),
            None => warn!(message = %message.id, "Embed registry dropped, session will not react"),
        }
        debug!(message = %message.id, user = %self.user(), "Showing embed session");

        self.show_page(PageId(0)).await
    }

    /// Makes `id` the current page and renders it.
    ///
    /// The message reactions are replaced in the background; failures there
    /// never surface to the caller. Replacement started for an earlier render
    /// stops before touching the message again.
    pub async fn show_page(&self, id: PageId) -> EmbedResult<()> {
        let (message, embed, render) = {
            let mut state = self.inner.state.lock();
            let embed = state
                .pages
                .get(id.0)
                .ok_or(EmbedError::UnknownPage(id.0))?
                .embed()
                .clone();
            let message = state.message.ok_or(EmbedError::NotShown)?;
            state.current = Some(id);
            state.render += 1;
            (message, embed, state.render)
        };

        self.inner
            .gateway
            .edit_message(self.target(), message, MessageEdit::embed(embed))
            .await?;
        trace!(%message, page = id.0, "Rendered embed page");

        tokio::spawn(self.clone().replace_reactions(message, id, render));
        Ok(())
    }

    /// Deletes the session message. The registry forgets the session when the
    /// delete event comes back.
    pub async fn delete(&self) -> EmbedResult<()> {
        let message = self.message_id().ok_or(EmbedError::NotShown)?;
        self.inner
            .gateway
            .delete_message(self.target(), message)
            .await?;
        Ok(())
    }

    /// Handlers on the current page for `emoji`.
    pub(super) fn current_handlers(&self, emoji: &Emoji) -> Vec<OptionHandler> {
        let state = self.inner.state.lock();
        state
            .current
            .and_then(|id| state.pages.get(id.0))
            .map(|page| page.handlers_for(emoji))
            .unwrap_or_default()
    }

    fn is_stale(&self, render: u64) -> bool {
        self.inner.state.lock().render != render
    }

    async fn replace_reactions(self, message: MessageId, id: PageId, render: u64) {
        let gateway = &self.inner.gateway;
        let channel = self.target();

        let _turn = self.inner.reactions.lock().await;
        if self.is_stale(render) {
            trace!(%message, page = id.0, "Skipping reactions of a replaced render");
            return;
        }

        if let Err(err) = gateway.remove_all_reactions(channel, message).await {
            warn!(%message, error = %err, "Failed to clear reactions");
            return;
        }

        let options = match self.page(id) {
            Some(page) => page.options().to_vec(),
            None => return,
        };

        let mut edited = false;
        for option in &options {
            if self.is_stale(render) {
                trace!(%message, page = id.0, "Page replaced, stopping reactions");
                return;
            }
            let Err(err) = gateway.add_reaction(channel, message, &option.emoji).await else {
                continue;
            };
            if !err.is_unknown_emoji() {
                warn!(%message, emoji = %option.emoji, error = %err, "Failed to add reaction");
                return;
            }

            warn!(%message, emoji = %option.emoji, "Unknown emoji, dropping its field");
            let removed = {
                let mut state = self.inner.state.lock();
                state
                    .pages
                    .get_mut(id.0)
                    .is_some_and(|page| page.remove_option_field(option))
            };
            if removed {
                edited = true;
                let notice = MessageSend::embed(Embed::new().description(MISSING_EMOJI_NOTICE));
                if let Err(err) = gateway.send_message(channel, notice).await {
                    warn!(error = %err, "Failed to send missing emoji notice");
                }
            }
        }

        if !edited {
            return;
        }
        let embed = {
            let state = self.inner.state.lock();
            if state.render != render {
                return;
            }
            state.pages.get(id.0).map(|p| p.embed().clone())
        };
        if let Some(embed) = embed
            && let Err(err) = gateway
                .edit_message(channel, message, MessageEdit::embed(embed))
                .await
        {
            warn!(%message, error = %err, "Failed to re-render page");
        }
    }

    /// Whether both handles refer to the same session.
    pub fn ptr_eq(&self, other: &EmbedSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EmbedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EmbedSession")
            .field("target", &self.inner.target)
            .field("user", &self.inner.user)
            .field("message", &state.message)
            .field("pages", &state.pages.len())
            .field("current", &state.current)
            .finish()
    }
}
