//! Error classification and reporting.
//!
//! Every error that escapes a handler ends up here. Expected failures (the
//! [`CommandError`] sentinels and forbidden REST calls) are rendered to a
//! fixed message. Anything else goes to the configured [`TelemetrySink`] and
//! the user gets a generic apology.
//!
//! Without a telemetry sink an unexpected error panics. Nobody is watching,
//! so the failure has to be loud.

use std::sync::Arc;

use ember_core::{Embed, color};
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::error::CommandError;
use crate::permissions::MissingPermission;

const INVALID_ARGUMENT: &str = "The arguments that you passed to the command are invalid.";
const USER_NO_PERMISSIONS: &str = "You do not have permission to use this command.";
const ROUTE_NOT_FOUND: &str = "This command does not exist";
const ROUTE_EXISTS: &str = "This command is already registered";
const NOT_A_GUILD: &str = "This command cannot be ran in DMs";
const NOT_A_DM: &str = "This command cannot be ran in a Guild";
const NOT_FOUND: &str = "The resource or object the command needed does not exist";
const BOT_NO_PERMISSIONS: &str = "The bot does not have the required permissions for the command \
                                  that was ran, please make sure it has before running it again.";
const UNEXPECTED: &str = "An unknown error has occurred and has been reported to my developers, \
                          sorry for any inconvenience this has caused";

/// Receives errors the classifier does not recognise.
pub trait TelemetrySink: Send + Sync + 'static {
    fn capture(&self, error: &CommandError, ctx: &Context);
}

impl<F> TelemetrySink for F
where
    F: Fn(&CommandError, &Context) + Send + Sync + 'static,
{
    fn capture(&self, error: &CommandError, ctx: &Context) {
        self(error, ctx)
    }
}

pub type BoxedTelemetry = Arc<dyn TelemetrySink>;

/// Reinterprets a forbidden REST call as a missing bot permission.
pub fn normalize(err: CommandError) -> CommandError {
    match err {
        CommandError::Api(api) if api.is_forbidden() => match api.as_rest() {
            Some(rest) => CommandError::BotNoPermissions(MissingPermission::from_rest(rest)),
            None => CommandError::Api(api),
        },
        other => other,
    }
}

/// The user-facing text for an expected error, or `None` if the error is
/// unexpected. `usage` is the route's usage string, possibly empty.
pub fn user_message(err: &CommandError, usage: &str) -> Option<String> {
    let text = match err {
        CommandError::InvalidArgument if usage.is_empty() => INVALID_ARGUMENT.to_string(),
        CommandError::InvalidArgument => format!(
            "{INVALID_ARGUMENT} Please make sure you are following the user instructions: `{usage}`"
        ),
        CommandError::UserNoPermissions => USER_NO_PERMISSIONS.to_string(),
        CommandError::RouteNotFound => ROUTE_NOT_FOUND.to_string(),
        CommandError::RouteExists => ROUTE_EXISTS.to_string(),
        CommandError::NotAGuild => NOT_A_GUILD.to_string(),
        CommandError::NotADm => NOT_A_DM.to_string(),
        CommandError::NotFound => NOT_FOUND.to_string(),
        CommandError::BotNoPermissions(missing) => match missing.permission {
            Some(permission) => format!(
                "The bot could not complete the requested operation, because it does not have \
                 the following permission(s): {permission}"
            ),
            None => BOT_NO_PERMISSIONS.to_string(),
        },
        _ => return None,
    };
    Some(text)
}

/// Turns handler errors into a single red embed in the invoking channel.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    telemetry: Option<BoxedTelemetry>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_telemetry<T: TelemetrySink>(mut self, sink: T) -> Self {
        self.telemetry = Some(Arc::new(sink));
        self
    }

    pub fn set_telemetry(&mut self, sink: BoxedTelemetry) {
        self.telemetry = Some(sink);
    }

    pub fn has_telemetry(&self) -> bool {
        self.telemetry.is_some()
    }

    /// Classifies `err` and reports it to the user.
    ///
    /// # Panics
    ///
    /// Panics on an unexpected error when no telemetry sink is configured.
    pub async fn report(&self, ctx: &Context, err: CommandError) {
        let err = normalize(err);
        let text = match user_message(&err, &ctx.route().usage_string()) {
            Some(text) => {
                debug!(error = %err, "Reporting command error");
                text
            }
            None => match &self.telemetry {
                Some(sink) => {
                    error!(error = %err, route = %ctx.route().name(), "Unexpected command error");
                    sink.capture(&err, ctx);
                    UNEXPECTED.to_string()
                }
                None => panic!("unhandled command error: {err}"),
            },
        };

        let embed = Embed::new()
            .description(text)
            .color(color::RED)
            .timestamp_now();
        if let Err(send_err) = ctx.reply_embed(embed).await {
            warn!(error = %send_err, channel = %ctx.channel_id(), "Failed to send error report");
        }
    }
}
