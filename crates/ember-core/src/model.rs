//! Platform object model.
//!
//! These are the plain data types the gateway hands to the framework and the
//! framework hands back. They carry only what the command framework reads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::embed::Embed;
use crate::id::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            bot: false,
        }
    }
}

/// A message posted in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// `None` for direct messages.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl Message {
    /// Returns `true` when the message was posted outside of any guild.
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}

/// A guild or direct-message channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub name: String,
}

/// A guild, as far as the framework cares about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    /// Members known to the gateway. May be partial for large guilds.
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Guild {
    pub fn new(id: impl Into<GuildId>, name: impl Into<String>, owner: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner.into(),
            members: Vec::new(),
        }
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub guild_id: GuildId,
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl Member {
    pub fn new(guild: impl Into<GuildId>, user: User) -> Self {
        Self {
            guild_id: guild.into(),
            user,
            nick: None,
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// A unicode emoji or a custom guild emoji.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<EmojiId>,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// A standard unicode emoji such as `"❌"`.
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            animated: false,
        }
    }

    /// A custom guild emoji.
    pub fn custom(name: impl Into<String>, id: impl Into<EmojiId>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            animated: false,
        }
    }

    /// The form used in reaction endpoints: `name:id` for custom emojis,
    /// the bare character otherwise.
    pub fn api_name(&self) -> String {
        match self.id {
            Some(id) => format!("{}:{}", self.name, id),
            None => self.name.clone(),
        }
    }

    /// Whether two emojis address the same reaction.
    pub fn same_as(&self, other: &Emoji) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name,
            _ => false,
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) if self.animated => write!(f, "<a:{}:{}>", self.name, id),
            Some(id) => write!(f, "<:{}:{}>", self.name, id),
            None => f.write_str(&self.name),
        }
    }
}

/// A reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdd {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub emoji: Emoji,
}

/// A message removed from a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

/// The session is established and the bot's own identity is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<GuildId>,
}
