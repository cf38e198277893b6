//! Discord bot commands (!channelid, !status, !help).
//!
//! Handles command parsing and execution for Discord commands.

use std::sync::Arc;

use serenity::model::channel::Message;
use serenity::prelude::*;
use tracing::{debug, info};

use crate::bridge::SubscriberRegistry;

const HELP_TEXT: &str = "**Bridge commands**\n\
    `!channelid` - show this channel's id (for `servers[].channel`)\n\
    `!status` - list the game servers relayed in this channel\n\
    `!help` - show this message";

/// A recognised bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    ChannelId,
    Status,
    Help,
}

impl BotCommand {
    /// Parse a message body. Anything that is not a known `!command` is `None`.
    pub fn parse(content: &str) -> Option<Self> {
        if content.len() > 100 {
            return None;
        }
        let rest = content.trim().strip_prefix('!')?;
        let command = rest.split_whitespace().next()?.to_lowercase();

        match command.as_str() {
            "channelid" | "channel" => Some(Self::ChannelId),
            "status" => Some(Self::Status),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Reply for `!status` given the servers currently relayed in a channel.
pub fn status_text(servers: &[String]) -> String {
    if servers.is_empty() {
        return "No game servers are relayed in this channel.".to_string();
    }
    format!("Relaying: {}", servers.join(", "))
}

/// Command handler for Discord bot.
pub struct CommandHandler {
    registry: Arc<SubscriberRegistry>,
}

impl CommandHandler {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self { registry }
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_command(
        &self,
        ctx: &Context,
        msg: &Message,
        content: &str,
    ) -> anyhow::Result<bool> {
        let Some(command) = BotCommand::parse(content) else {
            return Ok(false);
        };
        debug!("Processing command: {:?}", command);

        let reply = match command {
            BotCommand::ChannelId => {
                info!("!channelid command from {}", msg.author.name);
                format!("Channel id: `{}`", msg.channel_id.get())
            }
            BotCommand::Status => {
                info!("!status command from {}", msg.author.name);
                let servers = self.registry.subscribers(msg.channel_id.get()).await;
                status_text(&servers)
            }
            BotCommand::Help => HELP_TEXT.to_string(),
        };

        msg.channel_id.say(&ctx.http, reply).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(BotCommand::parse("!channelid"), Some(BotCommand::ChannelId));
        assert_eq!(BotCommand::parse("  !STATUS please"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("!help"), Some(BotCommand::Help));
    }

    #[test]
    fn test_parse_ignores_chat() {
        assert_eq!(BotCommand::parse("hello !status"), None);
        assert_eq!(BotCommand::parse("!"), None);
        assert_eq!(BotCommand::parse("!kick everyone"), None);
        assert_eq!(BotCommand::parse(&format!("!status {}", "x".repeat(100))), None);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(
            status_text(&[]),
            "No game servers are relayed in this channel."
        );
        assert_eq!(
            status_text(&["ctf".to_string(), "dm".to_string()]),
            "Relaying: ctf, dm"
        );
    }
}
