//! Guild role lookups.
//!
//! [`RoleResolver`] answers the two questions a policy engine with role
//! inheritance asks: which roles a user holds in a guild, and which users
//! hold a role. Both consult the gateway's state cache first and fall back to
//! REST.
//!
//! ```rust,ignore
//! let roles = RoleResolver::new(Arc::clone(ctx.gateway()));
//! if !roles.has_link(guild, ctx.author().id, moderator).await? {
//!     return Err(CommandError::UserNoPermissions);
//! }
//! ```

use std::fmt;

use ember_core::{ApiResult, BoxedGateway, Guild, GuildId, Member, RoleId, UserId};
use tracing::trace;

/// Resolves guild role membership through a gateway.
#[derive(Clone)]
pub struct RoleResolver {
    gateway: BoxedGateway,
}

impl RoleResolver {
    pub fn new(gateway: BoxedGateway) -> Self {
        Self { gateway }
    }

    /// Roles `user` holds in `guild`.
    pub async fn roles(&self, guild: GuildId, user: UserId) -> ApiResult<Vec<RoleId>> {
        trace!(%guild, %user, "Resolving member roles");
        Ok(self.member(guild, user).await?.roles)
    }

    /// Whether `user` holds `role` in `guild`.
    pub async fn has_link(&self, guild: GuildId, user: UserId, role: RoleId) -> ApiResult<bool> {
        Ok(self.roles(guild, user).await?.contains(&role))
    }

    /// Users of `guild` holding `role`, among the members the guild lists.
    pub async fn users(&self, guild: GuildId, role: RoleId) -> ApiResult<Vec<UserId>> {
        trace!(%guild, %role, "Resolving role holders");
        let guild = self.guild(guild).await?;
        Ok(guild
            .members
            .iter()
            .filter(|m| m.has_role(role))
            .map(|m| m.user.id)
            .collect())
    }

    async fn member(&self, guild: GuildId, user: UserId) -> ApiResult<Member> {
        match self.gateway.cached_member(guild, user) {
            Some(m) => Ok(m),
            None => self.gateway.fetch_member(guild, user).await,
        }
    }

    async fn guild(&self, guild: GuildId) -> ApiResult<Guild> {
        match self.gateway.cached_guild(guild) {
            Some(g) => Ok(g),
            None => self.gateway.fetch_guild(guild).await,
        }
    }
}

impl fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ember_core::User;
    use ember_core::testing::MockGateway;

    const GUILD: GuildId = GuildId(10);
    const MODS: RoleId = RoleId(500);
    const MUTED: RoleId = RoleId(501);

    fn member(user: u64, roles: &[RoleId]) -> Member {
        Member::new(GUILD, User::new(user, format!("user{user}"))).with_roles(roles.iter().copied())
    }

    #[tokio::test]
    async fn test_roles_prefer_cache_then_rest() {
        let gateway = Arc::new(MockGateway::new(99));
        gateway.cache_member(member(1, &[MODS]));
        gateway.remote_member(member(2, &[MUTED]));
        let roles = RoleResolver::new(gateway);

        assert_eq!(roles.roles(GUILD, UserId(1)).await.unwrap(), vec![MODS]);
        assert_eq!(roles.roles(GUILD, UserId(2)).await.unwrap(), vec![MUTED]);
        assert!(roles.roles(GUILD, UserId(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_has_link() {
        let gateway = Arc::new(MockGateway::new(99));
        gateway.cache_member(member(1, &[MODS, MUTED]));
        let roles = RoleResolver::new(gateway);

        assert!(roles.has_link(GUILD, UserId(1), MODS).await.unwrap());
        assert!(!roles.has_link(GUILD, UserId(1), RoleId(502)).await.unwrap());
    }

    #[tokio::test]
    async fn test_users_with_role() {
        let gateway = Arc::new(MockGateway::new(99));
        let mut guild = Guild::new(GUILD, "guild", 1u64);
        guild.members = vec![member(1, &[MODS]), member(2, &[MUTED]), member(3, &[MUTED, MODS])];
        gateway.remote_guild(guild);
        let roles = RoleResolver::new(gateway);

        assert_eq!(roles.users(GUILD, MODS).await.unwrap(), vec![UserId(1), UserId(3)]);
        assert!(roles.users(GUILD, RoleId(9)).await.unwrap().is_empty());
        assert!(roles.users(GuildId(11), MODS).await.is_err());
    }
}
