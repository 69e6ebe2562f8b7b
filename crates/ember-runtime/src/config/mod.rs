//! Configuration for the Ember runtime.
//!
//! Settings are layered with figment: built-in defaults, config files and
//! `EMBER_`-prefixed environment variables. See [`loader`] for the order.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSettings, EmberConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
