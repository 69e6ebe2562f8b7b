//! Error types for the Ember framework.
//!
//! [`CommandError`] is what handlers return. Its sentinel variants are the
//! expected failures a handler can hand back without writing its own reply;
//! the dispatcher renders each of them into a fixed message (see
//! [`crate::report`]). Anything else is unexpected and goes to telemetry.

use ember_core::{ApiError, MessageId};
use thiserror::Error;

use crate::permissions::MissingPermission;

/// Boxed error used for unexpected failures, compatible with `tower::BoxError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by routing and by command handlers.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No route matched the input.
    #[error("could not find route")]
    RouteNotFound,

    /// A sibling route already matches this name.
    #[error("route already exists")]
    RouteExists,

    /// The user passed arguments the command could not accept.
    #[error("the command has been passed invalid arguments by the user")]
    InvalidArgument,

    /// The invoking user may not run this command.
    #[error("the user does not have the needed permissions to run this command")]
    UserNoPermissions,

    /// The command needs a guild but was run in a DM.
    #[error("this command can only be run inside a guild")]
    NotAGuild,

    /// The command needs a DM but was run in a guild.
    #[error("this command can only be run inside DMs")]
    NotADm,

    /// A resource the command needed does not exist.
    #[error("the requested object wasn't found")]
    NotFound,

    /// The bot lacks a platform permission for something it tried to do.
    #[error(transparent)]
    BotNoPermissions(#[from] MissingPermission),

    /// A gateway call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The handler panicked; the payload is the panic message.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Any other failure.
    #[error(transparent)]
    Unexpected(BoxError),
}

impl CommandError {
    /// Wraps an arbitrary error as an unexpected failure.
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        Self::Unexpected(err.into())
    }
}

/// Result type returned by command handlers.
pub type CommandResult = Result<(), CommandError>;

/// Errors from the stateful embed engine.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// `show` was called on a session without pages.
    #[error("embed session has no pages")]
    NoPages,

    /// A page operation needs the session message, but the session was never shown.
    #[error("embed session has not been shown yet")]
    NotShown,

    /// `show` was called on a session that already has a message.
    #[error("embed session is already shown as message {0}")]
    AlreadyShown(MessageId),

    /// The page id does not belong to this session.
    #[error("page {0} does not exist in this session")]
    UnknownPage(usize),

    /// A gateway call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<EmbedError> for CommandError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Api(api) => Self::Api(api),
            other => Self::unexpected(other),
        }
    }
}

/// Result type for embed operations.
pub type EmbedResult<T> = Result<T, EmbedError>;
