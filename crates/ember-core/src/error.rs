//! Transport error types.
//!
//! The gateway collaborator reports every failed call as an [`ApiError`].
//! Failed REST requests keep enough of the request around (method and path)
//! for the framework to work out which permission the bot was missing.

use thiserror::Error;

/// JSON error code returned when a reaction references an emoji that no longer exists.
pub const UNKNOWN_EMOJI_CODE: u32 = 10014;

/// A REST request that came back with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} {path} failed with HTTP {status}: {message}")]
pub struct RestError {
    /// HTTP status code of the response.
    pub status: u16,
    /// HTTP method of the failed request, upper case.
    pub method: String,
    /// Request path, e.g. `/api/v10/channels/1/messages`.
    pub path: String,
    /// Platform-specific JSON error code, when the body carried one.
    pub code: Option<u32>,
    /// Human-readable message from the response body.
    pub message: String,
}

impl RestError {
    pub fn new(status: u16, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status,
            method: method.into(),
            path: path.into(),
            code: None,
            message: String::new(),
        }
    }

    pub fn with_code(mut self, code: u32, message: impl Into<String>) -> Self {
        self.code = Some(code);
        self.message = message.into();
        self
    }
}

/// Errors returned by [`Gateway`](crate::Gateway) calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The REST API rejected the request.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The gateway session is not connected.
    #[error("gateway is not connected")]
    NotConnected,

    /// The call did not complete in time.
    #[error("API call timed out")]
    Timeout,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// The failed REST request, if this error carries one.
    pub fn as_rest(&self) -> Option<&RestError> {
        match self {
            Self::Rest(rest) => Some(rest),
            _ => None,
        }
    }

    /// HTTP 403: the bot lacks a permission for the request.
    pub fn is_forbidden(&self) -> bool {
        self.as_rest().is_some_and(|r| r.status == 403)
    }

    /// The request referenced an emoji that does not exist.
    pub fn is_unknown_emoji(&self) -> bool {
        self.as_rest()
            .is_some_and(|r| r.code == Some(UNKNOWN_EMOJI_CODE))
    }
}

/// Result type for gateway calls.
pub type ApiResult<T> = Result<T, ApiError>;
