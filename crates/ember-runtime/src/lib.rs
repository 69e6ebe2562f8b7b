//! Ember Runtime - configuration, logging and bot wiring.
//!
//! This crate provides:
//! - Layered configuration loading (`config`)
//! - Logging initialization over `tracing-subscriber` (`logging`)
//! - The [`Bot`] that subscribes a dispatcher and an embed registry to a
//!   gateway's events
//!
//! ```rust,ignore
//! use ember_runtime::{Bot, config::load_config, logging};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let bot = Bot::builder(connect_gateway().await?)
//!         .config(&config)
//!         .telemetry(|err: &CommandError, _ctx: &Context| report_upstream(err))
//!         .build()?;
//!     register_commands(bot.router());
//!
//!     tokio::signal::ctrl_c().await?;
//!     bot.shutdown();
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;

pub use bot::{Bot, BotBuilder};
pub use config::{BotSettings, ConfigError, ConfigLoader, ConfigResult, EmberConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
