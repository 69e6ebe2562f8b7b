//! Rich embed payloads.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Embed accent colours.
pub mod color {
    pub const RED: u32 = 0xE7_4C_3C;
    pub const GREEN: u32 = 0x2E_CC_71;
    pub const BLUE: u32 = 0x34_98_DB;
}

/// A single name/value field inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// A rich embed attached to a message.
///
/// Builder methods consume and return the embed; the `push_*`/`remove_*`
/// methods edit one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Stamps the embed with the current UTC time.
    pub fn timestamp_now(mut self) -> Self {
        self.timestamp = Some(OffsetDateTime::now_utc());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.push_field(name, value, inline);
        self
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) {
        self.fields.push(EmbedField::new(name, value, inline));
    }

    /// Removes the field at `index`, returning it if it existed.
    pub fn remove_field(&mut self, index: usize) -> Option<EmbedField> {
        (index < self.fields.len()).then(|| self.fields.remove(index))
    }

    /// Index of the first field with exactly this name.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_remove() {
        let mut embed = Embed::new()
            .title("t")
            .field("a", "1", false)
            .field("b", "2", true);
        assert_eq!(embed.position_of("b"), Some(1));
        assert_eq!(embed.remove_field(0).map(|f| f.name), Some("a".to_string()));
        assert!(embed.remove_field(5).is_none());
        assert_eq!(embed.fields.len(), 1);
    }

    #[test]
    fn test_serialize_skips_empty() {
        let json = serde_json::to_value(Embed::new().description("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "description": "hi" }));
    }
}
