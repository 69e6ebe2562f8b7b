//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSettings, EmberConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &EmberConfig) -> ConfigResult<()> {
    validate_bot_settings(&config.bot)?;
    Ok(())
}

fn validate_bot_settings(bot: &BotSettings) -> ConfigResult<()> {
    if bot.prefix.is_empty() {
        return Err(ConfigError::validation("Command prefix cannot be empty"));
    }

    // Messages are tokenized on whitespace, so such a prefix could never match.
    if bot.prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Command prefix cannot contain whitespace: {:?}",
            bot.prefix
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&EmberConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let mut config = EmberConfig::default();
        config.bot.prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_whitespace_prefix() {
        let mut config = EmberConfig::default();
        config.bot.prefix = "! ".to_string();
        assert!(validate_config(&config).is_err());

        config.bot.prefix = "!!".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
