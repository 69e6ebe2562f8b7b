//! Paged field lists built on embed sessions.
//!
//! A [`PagingContext`] chunks a field list into pages of
//! [`FIELDS_PER_PAGE`] and renders the current page with navigation options
//! around the content fields:
//!
//! | Emoji | Option  | Shown when                         |
//! |-------|---------|------------------------------------|
//! | ⬅     | Back    | not on the first page              |
//! | 🔼    | Up      | inside a sub-page                  |
//! | ➡     | Forward | not on the last page               |
//! | *own* | drill   | the field links a [`PagingPage`]   |
//! | ❌    | Close   | always                             |
//!
//! The context lives in the session data. Every transition edits it and
//! renders the result into the session's single page slot.

use std::sync::Arc;

use ember_core::{ChannelId, Embed, Emoji, ReactionAdd, UserId};

use super::page::{OptionHandler, StatefulEmbed, option_handler};
use super::registry::EmbedRegistry;
use super::session::{EmbedSession, PageId};
use crate::error::EmbedResult;

pub const FIELDS_PER_PAGE: usize = 8;

pub const BACK_EMOJI: &str = "⬅";
pub const UP_EMOJI: &str = "🔼";
pub const FORWARD_EMOJI: &str = "➡";
pub const CLOSE_EMOJI: &str = "❌";

/// A list entry, optionally linking to a sub-page.
#[derive(Debug, Clone, PartialEq)]
pub struct PagingField {
    pub name: String,
    pub value: String,
    pub inline: bool,
    pub link: Option<PagingPage>,
}

impl PagingField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
            link: None,
        }
    }

    /// Lets the user drill into `page` by reacting with its emoji.
    pub fn link(mut self, page: PagingPage) -> Self {
        self.link = Some(page);
        self
    }
}

/// A nested list reached from a [`PagingField`].
#[derive(Debug, Clone, PartialEq)]
pub struct PagingPage {
    pub emoji: Emoji,
    pub title: String,
    pub description: String,
    pub fields: Vec<PagingField>,
}

impl PagingPage {
    pub fn new(
        emoji: Emoji,
        title: impl Into<String>,
        description: impl Into<String>,
        fields: Vec<PagingField>,
    ) -> Self {
        Self {
            emoji,
            title: title.into(),
            description: description.into(),
            fields,
        }
    }
}

/// Navigation state of a paged list.
#[derive(Debug, Clone, PartialEq)]
pub struct PagingContext {
    fields: Vec<PagingField>,
    base: Embed,
    current_page: usize,
    parent: Option<Box<PagingContext>>,
}

impl PagingContext {
    /// Starts on page 1 of `fields`. `base` supplies title, description and
    /// colour; its own fields are ignored.
    pub fn new(fields: Vec<PagingField>, base: Embed) -> Self {
        Self {
            fields,
            base,
            current_page: 1,
            parent: None,
        }
    }

    pub fn fields(&self) -> &[PagingField] {
        &self.fields
    }

    pub fn base(&self) -> &Embed {
        &self.base
    }

    /// 1-based.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of pages; an empty list still has one.
    pub fn page_count(&self) -> usize {
        self.fields.len().div_ceil(FIELDS_PER_PAGE).max(1)
    }

    pub fn parent(&self) -> Option<&PagingContext> {
        self.parent.as_deref()
    }

    fn page_start(&self) -> usize {
        (self.current_page - 1) * FIELDS_PER_PAGE
    }

    fn visible_fields(&self) -> &[PagingField] {
        let start = self.page_start().min(self.fields.len());
        let end = (start + FIELDS_PER_PAGE).min(self.fields.len());
        &self.fields[start..end]
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    pub fn forward(&mut self) -> bool {
        if self.current_page >= self.page_count() {
            return false;
        }
        self.current_page += 1;
        true
    }

    pub fn back(&mut self) -> bool {
        if self.current_page <= 1 {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Enters the sub-page linked from field `index` if `emoji` is its emoji.
    ///
    /// The current state becomes the parent, copied in full.
    pub fn drill(&mut self, index: usize, emoji: &Emoji) -> bool {
        let Some(link) = self.fields.get(index).and_then(|f| f.link.clone()) else {
            return false;
        };
        if !link.emoji.same_as(emoji) {
            return false;
        }

        let parent = self.clone();
        self.base.title = (!link.title.is_empty()).then_some(link.title);
        self.base.description = (!link.description.is_empty()).then_some(link.description);
        self.fields = link.fields;
        self.current_page = 1;
        self.parent = Some(Box::new(parent));
        true
    }

    /// Returns to the parent exactly as it was left.
    pub fn up(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                *self = *parent;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Builds the current page.
    pub fn render(&self) -> StatefulEmbed {
        let mut embed = self.base.clone();
        embed.fields.clear();
        let mut page = StatefulEmbed::from_embed(embed);

        if self.current_page > 1 {
            page.add_field(
                "Back",
                "Goes back a page.",
                false,
                Some((Emoji::unicode(BACK_EMOJI), navigate(|ctx, _| ctx.back()))),
            );
        }
        if self.parent.is_some() {
            page.add_field(
                "Up",
                "Goes back a menu",
                false,
                Some((Emoji::unicode(UP_EMOJI), navigate(|ctx, _| ctx.up()))),
            );
        }
        if self.current_page < self.page_count() {
            page.add_field(
                "Forward",
                "Goes forward a page.",
                false,
                Some((Emoji::unicode(FORWARD_EMOJI), navigate(|ctx, _| ctx.forward()))),
            );
        }

        let start = self.page_start();
        for (offset, field) in self.visible_fields().iter().enumerate() {
            let index = start + offset;
            let reaction = field.link.as_ref().map(|link| {
                let handler = navigate(move |ctx, reaction| ctx.drill(index, &reaction.emoji));
                (link.emoji.clone(), handler)
            });
            page.add_field(&field.name, &field.value, field.inline, reaction);
        }

        page.add_field(
            "Close",
            "Closes the embed.",
            false,
            Some((
                Emoji::unicode(CLOSE_EMOJI),
                option_handler(|session: EmbedSession, _| async move { session.delete().await }),
            )),
        );
        page
    }

    /// Wraps the context in a new session, ready to [`show`](EmbedSession::show).
    pub fn into_session(self, registry: &EmbedRegistry, target: ChannelId, user: UserId) -> EmbedSession {
        let session = registry.session(target, user);
        session.add_page(self.render());
        session.set_data(self);
        session
    }
}

/// An option that applies `step` to the session's paging context and
/// re-renders when it changed something.
fn navigate<F>(step: F) -> OptionHandler
where
    F: Fn(&mut PagingContext, &ReactionAdd) -> bool + Send + Sync + 'static,
{
    let step = Arc::new(step);
    option_handler(move |session: EmbedSession, reaction: ReactionAdd| {
        let step = Arc::clone(&step);
        async move {
            let moved = session
                .update_data(|ctx: &mut PagingContext| step(ctx, &reaction))
                .unwrap_or(false);
            if moved { refresh(&session).await } else { Ok(()) }
        }
    })
}

/// Re-renders the paging context into the session's page slot.
async fn refresh(session: &EmbedSession) -> EmbedResult<()> {
    let Some(page) = session.update_data(|ctx: &mut PagingContext| ctx.render()) else {
        return Ok(());
    };
    let slot = PageId(0);
    session.replace_page(slot, page)?;
    if session.message_id().is_some() {
        session.show_page(slot).await
    } else {
        Ok(())
    }
}
