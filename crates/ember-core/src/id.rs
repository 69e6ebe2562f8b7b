//! Snowflake identifiers and mention formatting.
//!
//! Every platform object is addressed by a 64-bit snowflake. Each object kind
//! gets its own newtype so a channel id can never be passed where a message id
//! is expected.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// Identifies a user account (including the bot itself).
    UserId
);
snowflake!(
    /// Identifies a guild channel or a direct-message channel.
    ChannelId
);
snowflake!(
    /// Identifies a guild.
    GuildId
);
snowflake!(
    /// Identifies a message within a channel.
    MessageId
);
snowflake!(
    /// Identifies a custom guild emoji.
    EmojiId
);
snowflake!(
    /// Identifies a guild role.
    RoleId
);

impl UserId {
    /// The plain mention form, `<@id>`.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }

    /// The nickname mention form, `<@!id>`.
    pub fn nick_mention(self) -> String {
        format!("<@!{}>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_forms() {
        let id = UserId(42);
        assert_eq!(id.mention(), "<@42>");
        assert_eq!(id.nick_mention(), "<@!42>");
    }

    #[test]
    fn test_parse_and_serialize_transparent() {
        let id: MessageId = "1234".parse().unwrap();
        assert_eq!(id, MessageId(1234));
        assert_eq!(serde_json::to_string(&id).unwrap(), "1234");
        assert!("abc".parse::<GuildId>().is_err());
    }
}
