//! Configuration validation.
//!
//! Collects every problem in one pass so a broken config can be fixed in
//! one go.

use std::collections::HashSet;

use crate::common::error::ConfigError;
use crate::config::types::{Config, ServerConfig};
use crate::game::classifier::Dialect;

const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_TOKEN_HERE";

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token.expose() == PLACEHOLDER_TOKEN {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }

    if config.servers.is_empty() {
        errors.push("servers is empty - nothing to relay".to_string());
    }
    let mut seen = HashSet::new();
    for (i, server) in config.servers.iter().enumerate() {
        validate_server(i, server, &mut errors);
        if !server.name.is_empty() && !seen.insert(server.name.as_str()) {
            errors.push(format!("servers[{}].name '{}' is used twice", i, server.name));
        }
    }

    if let Some(ref relay) = config.relay {
        let timeouts = [
            ("connect_timeout_ms", relay.connect_timeout_ms),
            ("banner_timeout_ms", relay.banner_timeout_ms),
            ("auth_timeout_ms", relay.auth_timeout_ms),
            ("server_name_timeout_ms", relay.server_name_timeout_ms),
            ("reconnect_min_delay_ms", relay.reconnect_min_delay_ms),
            ("reconnect_max_delay_ms", relay.reconnect_max_delay_ms),
        ];
        for (field, value) in timeouts {
            if value == Some(0) {
                errors.push(format!("relay.{} must be non-zero", field));
            }
        }
        if relay.reconnect_min_delay() > relay.reconnect_max_delay() {
            errors.push(
                "relay.reconnect_min_delay_ms must not exceed relay.reconnect_max_delay_ms"
                    .to_string(),
            );
        }
    }

    if let Some(ref filters) = config.filters {
        let lists = [
            ("game_to_chat", &filters.game_to_chat),
            ("chat_to_game", &filters.chat_to_game),
        ];
        for (direction, patterns) in lists {
            for (i, pattern) in patterns.iter().flatten().enumerate() {
                if fancy_regex::Regex::new(pattern).is_err() {
                    errors.push(format!(
                        "filters.{}[{}] is not a valid regex: '{}'",
                        direction, i, pattern
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

fn validate_server(i: usize, server: &ServerConfig, errors: &mut Vec<String>) {
    if server.name.trim().is_empty() {
        errors.push(format!("servers[{}].name is required", i));
    }
    if server.host.trim().is_empty() {
        errors.push(format!("servers[{}].host is required", i));
    }
    if server.port == 0 {
        errors.push(format!("servers[{}].port must be non-zero", i));
    }
    if server.password.is_empty() {
        errors.push(format!("servers[{}].password is required", i));
    }
    if let Err(e) = server.dialect.parse::<Dialect>() {
        errors.push(format!("servers[{}].dialect: {}", i, e));
    }
    if server.channel == 0 {
        errors.push(format!("servers[{}].channel must be non-zero", i));
    }
}
