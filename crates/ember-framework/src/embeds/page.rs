use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ember_core::{Embed, Emoji, ReactionAdd};
use futures::future::BoxFuture;

use super::session::EmbedSession;
use crate::error::EmbedResult;

/// Runs when the session user reacts with an option's emoji.
pub type OptionHandler =
    Arc<dyn Fn(EmbedSession, ReactionAdd) -> BoxFuture<'static, EmbedResult<()>> + Send + Sync>;

/// Erases an async function into an [`OptionHandler`].
pub fn option_handler<F, Fut>(f: F) -> OptionHandler
where
    F: Fn(EmbedSession, ReactionAdd) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EmbedResult<()>> + Send + 'static,
{
    Arc::new(
        move |session: EmbedSession, reaction: ReactionAdd| -> BoxFuture<'static, EmbedResult<()>> {
            Box::pin(f(session, reaction))
        },
    )
}

#[derive(Clone)]
pub(crate) struct EmbedOption {
    /// Field name without the emoji prefix; empty for bare reactions.
    pub(crate) name: String,
    pub(crate) emoji: Emoji,
    pub(crate) handler: OptionHandler,
}

impl EmbedOption {
    /// Name of the embed field this option rendered, if any.
    pub(crate) fn field_name(&self) -> Option<String> {
        (!self.name.is_empty()).then(|| format!("{} {}", self.emoji, self.name))
    }
}

/// One page of an embed session: an embed plus its emoji options.
///
/// Options are kept in declaration order; that is also the order the bot
/// reacts in when the page is shown.
#[derive(Clone, Default)]
pub struct StatefulEmbed {
    embed: Embed,
    options: Vec<EmbedOption>,
}

impl StatefulEmbed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a page from an existing embed, keeping its fields.
    pub fn from_embed(embed: Embed) -> Self {
        Self {
            embed,
            options: Vec::new(),
        }
    }

    pub fn embed(&self) -> &Embed {
        &self.embed
    }

    pub fn embed_mut(&mut self) -> &mut Embed {
        &mut self.embed
    }

    /// Adds a field. With a reaction, the field name is prefixed with the
    /// emoji and reacting with it runs the handler.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
        reaction: Option<(Emoji, OptionHandler)>,
    ) {
        let name = name.into();
        match reaction {
            Some((emoji, handler)) => {
                let display = format!("{emoji} {name}");
                self.options.push(EmbedOption {
                    name,
                    emoji,
                    handler,
                });
                self.embed.push_field(display, value, inline);
            }
            None => self.embed.push_field(name, value, inline),
        }
    }

    /// Adds a reaction option without a field.
    pub fn add_reaction(&mut self, emoji: Emoji, handler: OptionHandler) {
        self.options.push(EmbedOption {
            name: String::new(),
            emoji,
            handler,
        });
    }

    /// Option emojis in reaction order.
    pub fn emojis(&self) -> Vec<Emoji> {
        self.options.iter().map(|o| o.emoji.clone()).collect()
    }

    pub(crate) fn options(&self) -> &[EmbedOption] {
        &self.options
    }

    /// Handlers registered for `emoji`, in declaration order.
    pub(crate) fn handlers_for(&self, emoji: &Emoji) -> Vec<OptionHandler> {
        self.options
            .iter()
            .filter(|o| o.emoji.same_as(emoji))
            .map(|o| Arc::clone(&o.handler))
            .collect()
    }

    /// Removes the embed field rendered by `option`. Returns whether one was found.
    pub(crate) fn remove_option_field(&mut self, option: &EmbedOption) -> bool {
        let Some(name) = option.field_name() else {
            return false;
        };
        match self.embed.position_of(&name) {
            Some(index) => self.embed.remove_field(index).is_some(),
            None => false,
        }
    }
}

impl fmt::Debug for StatefulEmbed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulEmbed")
            .field("embed", &self.embed)
            .field("emojis", &self.emojis())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> OptionHandler {
        option_handler(|_session, _reaction| async { Ok(()) })
    }

    #[test]
    fn test_add_field_prefixes_emoji() {
        let mut page = StatefulEmbed::new();
        page.add_field("Plain", "no option", false, None);
        page.add_field("Next", "go on", true, Some((Emoji::unicode("➡"), noop())));

        let names: Vec<&str> = page.embed().fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Plain", "➡ Next"]);
        assert_eq!(page.emojis(), vec![Emoji::unicode("➡")]);
    }

    #[test]
    fn test_add_reaction_has_no_field() {
        let mut page = StatefulEmbed::new();
        page.add_reaction(Emoji::unicode("👍"), noop());
        assert!(page.embed().fields.is_empty());
        assert_eq!(page.emojis().len(), 1);
        assert!(page.options()[0].field_name().is_none());
    }

    #[test]
    fn test_handlers_for_matches_emoji() {
        let mut page = StatefulEmbed::new();
        page.add_reaction(Emoji::unicode("👍"), noop());
        page.add_field("Also", "thumbs", false, Some((Emoji::unicode("👍"), noop())));
        page.add_reaction(Emoji::custom("party", 5u64), noop());

        assert_eq!(page.handlers_for(&Emoji::unicode("👍")).len(), 2);
        assert_eq!(page.handlers_for(&Emoji::custom("renamed", 5u64)).len(), 1);
        assert!(page.handlers_for(&Emoji::unicode("👎")).is_empty());
    }

    #[test]
    fn test_remove_option_field() {
        let mut page = StatefulEmbed::new();
        page.add_field("Keep", "", false, Some((Emoji::unicode("1️⃣"), noop())));
        page.add_field("Drop", "", false, Some((Emoji::unicode("2️⃣"), noop())));
        let stale = page.options()[1].clone();

        assert!(page.remove_option_field(&stale));
        assert!(!page.remove_option_field(&stale));
        assert_eq!(page.embed().fields.len(), 1);
        assert_eq!(page.embed().fields[0].name, "1️⃣ Keep");
    }
}
