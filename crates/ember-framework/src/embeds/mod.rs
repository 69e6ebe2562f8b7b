//! Reaction-driven interactive embeds.
//!
//! An [`EmbedSession`] is one bot message plus a list of [`StatefulEmbed`]
//! pages. Each page declares emoji options; when the session user reacts with
//! one, the option handler runs against the session and can switch pages,
//! edit data or close the message. Reactions from anyone else are removed.
//!
//! The [`EmbedRegistry`] maps message ids to live sessions and is fed by the
//! gateway's reaction-add and message-delete events.
//!
//! ```rust,ignore
//! let registry = EmbedRegistry::new(gateway.clone());
//! registry.attach(gateway.events());
//!
//! let session = registry.session(channel, user);
//! let mut page = StatefulEmbed::from_embed(Embed::new().title("Vote"));
//! page.add_field("Yes", "", false, Some((Emoji::unicode("👍"), option_handler(
//!     async |session: EmbedSession, _| session.delete().await,
//! ))));
//! session.add_page(page);
//! session.show().await?;
//! ```
//!
//! [`PagingContext`] builds a paged, drill-down list on top of this.

mod page;
mod paging;
mod registry;
mod session;

pub use page::{OptionHandler, StatefulEmbed, option_handler};
pub use paging::{
    BACK_EMOJI, CLOSE_EMOJI, FIELDS_PER_PAGE, FORWARD_EMOJI, PagingContext, PagingField,
    PagingPage, UP_EMOJI,
};
pub use registry::{EmbedRegistry, ReactionOutcome};
pub use session::{EmbedSession, LOADING_TEXT, MISSING_EMOJI_NOTICE, PageId};
