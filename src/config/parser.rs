//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    load_config_str(&content)
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        discord {
            token = "abc.def.ghi"
            enable_markdown = true
        }
        relay {
            reconnect = false
            auth_timeout_ms = 3000
        }
        servers = [
            {
                name = "vanilla"
                host = "127.0.0.1"
                port = 8303
                password = "hunter2"
                dialect = "teeworlds"
                channel = 123456789012345678
            },
            {
                name = "race"
                host = "race.example.org"
                port = 8304
                password = "swordfish"
                type = "ddnet"
                channel = 123456789012345678
                display_name = "Race EU"
            }
        ]
        filters {
            game_to_chat = ["^\\[spam\\]"]
        }
    "#;

    #[test]
    fn test_load_sample_config() {
        let config = load_config_str(SAMPLE).unwrap();

        assert_eq!(config.discord.token.expose(), "abc.def.ghi");
        assert!(config.markdown_enabled());
        assert!(config.commands_enabled());
        assert!(!config.relay().reconnect());
        assert_eq!(config.relay().auth_timeout_ms, Some(3000));

        assert_eq!(config.servers.len(), 2);
        let race = &config.servers[1];
        assert_eq!(race.dialect, "ddnet");
        assert_eq!(race.channel, 123456789012345678);
        assert_eq!(race.display_name.as_deref(), Some("Race EU"));
        assert_eq!(race.password.expose(), "swordfish");

        let (game_to_chat, chat_to_game) = config.filter_patterns();
        assert_eq!(game_to_chat, vec![r"^\[spam\]".to_string()]);
        assert!(chat_to_game.is_empty());
    }

    #[test]
    fn test_missing_servers_is_a_parse_error() {
        let result = load_config_str(r#"discord { token = "x" }"#);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = load_config("/nonexistent/econ-bridge.conf");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
