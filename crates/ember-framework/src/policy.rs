//! Policy-engine authorization for commands.
//!
//! Routes registered below [`policy_middleware`] only run when the policy
//! engine allows `(author, guild, route name, "execute")`, or when the author
//! owns the guild.

use std::sync::Arc;

use ember_core::{GuildId, UserId};
use tracing::debug;

use crate::context::Context;
use crate::error::CommandError;
use crate::handler::{Middleware, Next, from_fn};

/// Action checked for every command invocation.
pub const EXECUTE_ACTION: &str = "execute";

/// A policy engine consulted for command access.
pub trait PolicyEnforcer: Send + Sync + 'static {
    /// Whether `subject` may perform `action` on `object` within `domain`.
    fn enforce(&self, subject: UserId, domain: GuildId, object: &str, action: &str) -> bool;
}

impl<F> PolicyEnforcer for F
where
    F: Fn(UserId, GuildId, &str, &str) -> bool + Send + Sync + 'static,
{
    fn enforce(&self, subject: UserId, domain: GuildId, object: &str, action: &str) -> bool {
        self(subject, domain, object, action)
    }
}

/// Middleware that gates handlers behind `enforcer`.
///
/// Fails with [`CommandError::NotAGuild`] outside guilds and
/// [`CommandError::UserNoPermissions`] on denial.
pub fn policy_middleware(enforcer: Arc<dyn PolicyEnforcer>) -> impl Middleware {
    from_fn(move |ctx: Arc<Context>, next: Next| {
        let enforcer = Arc::clone(&enforcer);
        async move {
            let guild = ctx.guild().await?;
            let author = ctx.author().id;
            let route = ctx.route().name();

            if guild.owner_id == author
                || enforcer.enforce(author, guild.id, &route, EXECUTE_ACTION)
            {
                next.run(ctx).await
            } else {
                debug!(user = %author, guild = %guild.id, %route, "Policy denied command");
                Err(CommandError::UserNoPermissions)
            }
        }
    })
}
