//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `ECONBRIDGE_CONFIG` - Path of the config file
//! - `ECONBRIDGE_DISCORD_TOKEN` - Discord bot token
//! - `ECONBRIDGE_SERVER_<NAME>_PASSWORD` - Console password of server `<NAME>`
//!   (upper-cased, anything but ASCII letters and digits replaced by `_`)

use std::env;

use crate::common::Secret;
use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "ECONBRIDGE";

const DEFAULT_CONFIG_PATH: &str = "econ-bridge.conf";

/// Name of the variable overriding the password of server `name`.
pub fn server_password_var(name: &str) -> String {
    let key: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_SERVER_{}_PASSWORD", ENV_PREFIX, key)
}

/// Apply environment variable overrides to a config.
///
/// Lets secrets live outside the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = Secret::new(token);
    }

    for server in &mut config.servers {
        if let Ok(password) = env::var(server_password_var(&server.name)) {
            server.password = Secret::new(password);
        }
    }

    config
}

/// Override variables that are set but empty.
pub fn check_empty_env_vars(config: &Config) -> Vec<String> {
    std::iter::once(format!("{}_DISCORD_TOKEN", ENV_PREFIX))
        .chain(config.servers.iter().map(|s| server_password_var(&s.name)))
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `ECONBRIDGE_CONFIG`, otherwise returns "econ-bridge.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_test_config(server_name: &str) -> Config {
        Config {
            discord: DiscordConfig {
                token: Secret::new("original_token"),
                enable_markdown: None,
                enable_commands: None,
            },
            relay: None,
            servers: vec![ServerConfig {
                name: server_name.to_string(),
                host: "127.0.0.1".to_string(),
                port: 8303,
                password: Secret::new("from_file"),
                dialect: "teeworlds".to_string(),
                channel: 42,
                display_name: None,
                game_to_chat_format: None,
            }],
            filters: None,
        }
    }

    #[test]
    fn test_server_password_var() {
        assert_eq!(server_password_var("race-eu.1"), "ECONBRIDGE_SERVER_RACE_EU_1_PASSWORD");
        assert_eq!(server_password_var("Vanilla"), "ECONBRIDGE_SERVER_VANILLA_PASSWORD");
    }

    #[test]
    fn test_get_config_path_default() {
        env::remove_var("ECONBRIDGE_CONFIG");
        assert_eq!(get_config_path(), "econ-bridge.conf");
    }

    #[test]
    fn test_server_password_override() {
        env::set_var("ECONBRIDGE_SERVER_ENV_OVERRIDE_TEST_PASSWORD", "from_env");

        let config = apply_env_overrides(make_test_config("env-override-test"));

        assert_eq!(config.servers[0].password.expose(), "from_env");
        env::remove_var("ECONBRIDGE_SERVER_ENV_OVERRIDE_TEST_PASSWORD");
    }

    #[test]
    fn test_no_override_keeps_file_values() {
        env::remove_var("ECONBRIDGE_SERVER_UNTOUCHED_PASSWORD");

        let config = apply_env_overrides(make_test_config("untouched"));

        assert_eq!(config.servers[0].password.expose(), "from_file");
    }

    #[test]
    fn test_empty_override_is_reported() {
        env::set_var("ECONBRIDGE_SERVER_EMPTY_VAR_PASSWORD", "");

        let empty = check_empty_env_vars(&make_test_config("empty-var"));

        assert!(empty.contains(&"ECONBRIDGE_SERVER_EMPTY_VAR_PASSWORD".to_string()));
        env::remove_var("ECONBRIDGE_SERVER_EMPTY_VAR_PASSWORD");
    }
}
