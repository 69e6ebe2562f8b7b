//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while assembling or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The supplied settings are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `build` was called outside a Tokio runtime.
    #[error("Bot must be built inside a Tokio runtime")]
    NoRuntime,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
