//! Mapping forbidden REST requests to the permission the bot was missing.
//!
//! A 403 response only says "forbidden". The request's method and the shape
//! of its endpoint path are usually enough to name the permission, e.g.
//! `POST /channels/{id}/messages` needs *Send Messages*.

use ember_core::RestError;
use thiserror::Error;

/// The bot was refused a request for lack of a permission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bot is missing the {} permission", permission.unwrap_or("required"))]
pub struct MissingPermission {
    /// The permission name, if the request could be identified.
    pub permission: Option<&'static str>,
    /// Path of the refused request.
    pub endpoint: String,
}

impl MissingPermission {
    /// Works out the missing permission from a forbidden request.
    pub fn from_rest(err: &RestError) -> Self {
        let resource = resource_key(&err.path);
        let permission = resource
            .as_deref()
            .and_then(|r| required_permission(&err.method, r));
        Self {
            permission,
            endpoint: err.path.clone(),
        }
    }
}

/// `(method, resource, permission)`; the resource is the path with ids removed.
const PERMISSION_TABLE: &[(&str, &str, &str)] = &[
    ("PATCH", "guilds", "Manage Server"),
    ("POST", "guilds/channels", "Manage Channels"),
    ("PATCH", "guilds/channels", "Manage Channels"),
    (
        "PATCH",
        "guilds/members",
        "Manage Nicknames, Manage Roles, Mute Members, Deafen Members and/or Move Members",
    ),
    ("PUT", "guilds/members/roles", "Manage Roles"),
    ("DELETE", "guilds/members/roles", "Manage Roles"),
    ("DELETE", "guilds/members", "Kick Members"),
    ("GET", "guilds/bans", "Ban Members"),
    ("PUT", "guilds/bans", "Ban Members"),
    ("DELETE", "guilds/bans", "Ban Members"),
    ("POST", "guilds/roles", "Manage Roles"),
    ("PATCH", "guilds/roles", "Manage Roles"),
    ("DELETE", "guilds/roles", "Manage Roles"),
    ("GET", "guilds/prune", "Kick Members"),
    ("POST", "guilds/prune", "Kick Members"),
    ("GET", "guilds/invites", "Manage Server"),
    ("GET", "guilds/integrations", "Manage Server"),
    ("POST", "guilds/integrations", "Manage Server"),
    ("PATCH", "guilds/integrations", "Manage Server"),
    ("DELETE", "guilds/integrations", "Manage Server"),
    ("GET", "guilds/embed", "Manage Server"),
    ("PATCH", "guilds/embed", "Manage Server"),
    ("GET", "guilds/vanity-url", "Manage Server"),
    ("POST", "guilds/emojis", "Manage Emojis"),
    ("PATCH", "guilds/emojis", "Manage Emojis"),
    ("DELETE", "guilds/emojis", "Manage Emojis"),
    ("GET", "guilds/webhooks", "Manage Webhooks"),
    ("GET", "guilds/audit-logs", "View Audit Log"),
    ("PUT", "channels", "Manage Channels"),
    ("PATCH", "channels", "Manage Channels"),
    ("DELETE", "channels", "Manage Channels"),
    (
        "GET",
        "channels/messages",
        "Read Messages and/or Read Message History",
    ),
    ("POST", "channels/messages", "Send Messages"),
    ("DELETE", "channels/messages", "Manage Messages"),
    (
        "PUT",
        "channels/messages/reactions",
        "Read Message History and/or Add Reactions",
    ),
    ("DELETE", "channels/messages/reactions", "Manage Messages"),
    ("PUT", "channels/permissions", "Manage Roles"),
    ("DELETE", "channels/permissions", "Manage Roles"),
    ("GET", "channels/invites", "Manage Channels"),
    ("POST", "channels/invites", "Create Invite"),
    ("PUT", "channels/pins", "Manage Messages"),
    ("DELETE", "channels/pins", "Manage Messages"),
    ("POST", "channels/webhooks", "Manage Webhooks"),
    ("GET", "channels/webhooks", "Manage Webhooks"),
    ("PATCH", "webhooks", "Manage Webhooks"),
    ("DELETE", "invites", "Manage Guild and/or Manage Channels"),
];

fn required_permission(method: &str, resource: &str) -> Option<&'static str> {
    PERMISSION_TABLE
        .iter()
        .find(|(m, r, _)| m.eq_ignore_ascii_case(method) && *r == resource)
        .map(|(_, _, p)| *p)
}

/// Reduces an endpoint path to its resource key, dropping the ids:
/// `/api/v10/channels/1/messages/2/reactions/x/@me` becomes
/// `channels/messages/reactions`.
///
/// Returns `None` for paths outside the API.
fn resource_key(path: &str) -> Option<String> {
    // Full URLs carry a scheme and host in front of the path.
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => path,
    };
    let mut rest = path.strip_prefix("/api/")?;
    if let Some((version, tail)) = rest.split_once('/')
        && version.len() > 1
        && version.starts_with('v')
        && version[1..].bytes().all(|b| b.is_ascii_digit())
    {
        rest = tail;
    }

    let parts: Vec<&str> = rest.split('/').collect();
    let mut key = parts[0].to_string();
    for index in [2, 4] {
        if let Some(part) = parts.get(index) {
            key.push('/');
            key.push_str(part);
        }
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forbidden(method: &str, path: &str) -> MissingPermission {
        MissingPermission::from_rest(&RestError::new(403, method, path))
    }

    #[test]
    fn test_resource_key_strips_ids_and_version() {
        assert_eq!(
            resource_key("/api/v10/channels/1/messages/2/reactions/x/@me").as_deref(),
            Some("channels/messages/reactions")
        );
        assert_eq!(resource_key("/api/guilds/5").as_deref(), Some("guilds"));
        assert_eq!(
            resource_key("https://discord.com/api/v9/guilds/5/bans/7").as_deref(),
            Some("guilds/bans")
        );
        assert_eq!(resource_key("/cdn/avatars/1"), None);
    }

    #[test]
    fn test_send_messages_permission() {
        let missing = forbidden("POST", "/api/v10/channels/123/messages");
        assert_eq!(missing.permission, Some("Send Messages"));
        assert_eq!(missing.endpoint, "/api/v10/channels/123/messages");
    }

    #[test]
    fn test_reaction_permissions_depend_on_method() {
        let add = forbidden("PUT", "/api/v10/channels/1/messages/2/reactions/%E2%9D%8C/@me");
        assert_eq!(
            add.permission,
            Some("Read Message History and/or Add Reactions")
        );
        let remove = forbidden("DELETE", "/api/v10/channels/1/messages/2/reactions/x/3");
        assert_eq!(remove.permission, Some("Manage Messages"));
    }

    #[test]
    fn test_unknown_endpoint_has_no_permission() {
        let missing = forbidden("GET", "/api/v10/users/@me");
        assert_eq!(missing.permission, None);
        assert_eq!(missing.to_string(), "bot is missing the required permission");
    }
}
