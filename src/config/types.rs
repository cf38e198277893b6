//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

use crate::common::Secret;
use crate::game::formatter::{DEFAULT_CHAT_TO_GAME_FORMAT, DEFAULT_GAME_TO_CHAT_FORMAT};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub relay: Option<RelayConfig>,
    pub servers: Vec<ServerConfig>,
    pub filters: Option<FiltersConfig>,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: Secret,
    /// Post game text as Discord markdown instead of escaping it.
    pub enable_markdown: Option<bool>,
    /// Answer `!channelid`, `!status` and `!help`.
    pub enable_commands: Option<bool>,
}

/// Settings shared by every relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    /// Restart relays that lost their connection.
    pub reconnect: Option<bool>,
    pub reconnect_min_delay_ms: Option<u64>,
    pub reconnect_max_delay_ms: Option<u64>,
    /// Give up after this many restarts in a row. Unlimited when unset.
    pub reconnect_max_attempts: Option<usize>,
    pub connect_timeout_ms: Option<u64>,
    pub banner_timeout_ms: Option<u64>,
    pub auth_timeout_ms: Option<u64>,
    pub drain_timeout_ms: Option<u64>,
    pub server_name_timeout_ms: Option<u64>,
    /// Ask each server for `sv_name` after login.
    pub query_server_name: Option<bool>,
    pub game_to_chat_format: Option<String>,
    pub chat_to_game_format: Option<String>,
}

/// One monitored game server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Stable key for this server, used in logs and env overrides.
    pub name: String,
    pub host: String,
    pub port: u16,
    pub password: Secret,
    /// Server flavour: "teeworlds", "trainfng" or "ddnet".
    #[serde(alias = "type")]
    pub dialect: String,
    /// Discord channel ID events are posted to and read from.
    pub channel: u64,
    /// Overrides the name the server reports for `%server`.
    pub display_name: Option<String>,
    /// Per-server override of `relay.game_to_chat_format`.
    pub game_to_chat_format: Option<String>,
}

/// Message filtering configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersConfig {
    /// Patterns blocking console events from reaching Discord.
    pub game_to_chat: Option<Vec<String>>,
    /// Patterns blocking Discord messages from reaching the game.
    pub chat_to_game: Option<Vec<String>>,
}

fn millis(value: Option<u64>, default: u64) -> Duration {
    Duration::from_millis(value.unwrap_or(default))
}

impl RelayConfig {
    pub fn reconnect(&self) -> bool {
        self.reconnect.unwrap_or(true)
    }

    pub fn reconnect_min_delay(&self) -> Duration {
        millis(self.reconnect_min_delay_ms, 5_000)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        millis(self.reconnect_max_delay_ms, 300_000)
    }

    pub fn connect_timeout(&self) -> Duration {
        millis(self.connect_timeout_ms, 10_000)
    }

    pub fn banner_timeout(&self) -> Duration {
        millis(self.banner_timeout_ms, 1_000)
    }

    pub fn auth_timeout(&self) -> Duration {
        millis(self.auth_timeout_ms, 5_000)
    }

    pub fn drain_timeout(&self) -> Duration {
        millis(self.drain_timeout_ms, 100)
    }

    pub fn server_name_timeout(&self) -> Duration {
        millis(self.server_name_timeout_ms, 2_000)
    }

    pub fn query_server_name(&self) -> bool {
        self.query_server_name.unwrap_or(true)
    }

    pub fn game_to_chat_format(&self) -> &str {
        self.game_to_chat_format
            .as_deref()
            .unwrap_or(DEFAULT_GAME_TO_CHAT_FORMAT)
    }

    pub fn chat_to_game_format(&self) -> &str {
        self.chat_to_game_format
            .as_deref()
            .unwrap_or(DEFAULT_CHAT_TO_GAME_FORMAT)
    }
}

impl Config {
    /// Relay settings, with defaults when the section is absent.
    pub fn relay(&self) -> RelayConfig {
        self.relay.clone().unwrap_or_default()
    }

    pub fn markdown_enabled(&self) -> bool {
        self.discord.enable_markdown.unwrap_or(false)
    }

    pub fn commands_enabled(&self) -> bool {
        self.discord.enable_commands.unwrap_or(true)
    }

    /// Filter patterns as (game -> chat, chat -> game).
    pub fn filter_patterns(&self) -> (Vec<String>, Vec<String>) {
        let filters = self.filters.clone().unwrap_or_default();
        (
            filters.game_to_chat.unwrap_or_default(),
            filters.chat_to_game.unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_defaults() {
        let relay = RelayConfig::default();
        assert!(relay.reconnect());
        assert!(relay.query_server_name());
        assert_eq!(relay.auth_timeout(), Duration::from_secs(5));
        assert_eq!(relay.banner_timeout(), Duration::from_secs(1));
        assert_eq!(relay.game_to_chat_format(), "[%server] %message");
        assert_eq!(relay.chat_to_game_format(), "%user: %message");
    }

    #[test]
    fn test_relay_overrides() {
        let relay = RelayConfig {
            reconnect: Some(false),
            drain_timeout_ms: Some(250),
            game_to_chat_format: Some("%message".to_string()),
            ..Default::default()
        };
        assert!(!relay.reconnect());
        assert_eq!(relay.drain_timeout(), Duration::from_millis(250));
        assert_eq!(relay.game_to_chat_format(), "%message");
    }
}
