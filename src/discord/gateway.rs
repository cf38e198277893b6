//! Posting relay events to Discord channels.

use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateAllowedMentions, CreateMessage};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::id::ChannelId;

use crate::bridge::ChatGateway;
use crate::common::{Destination, GatewayError};
use crate::discord::resolver::MessageResolver;
use crate::game::formatter::split_message;

/// Discord's per-message character limit.
pub const DISCORD_MAX_MESSAGE_LEN: usize = 2000;

/// `ChatGateway` backed by serenity's REST client.
pub struct DiscordGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
    resolver: MessageResolver,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, resolver: MessageResolver) -> Self {
        Self {
            http,
            cache,
            resolver,
        }
    }

    /// Discord-ready chunks of a game event.
    fn prepare(&self, text: &str) -> Vec<String> {
        let processed = self.resolver.process_game_to_chat(&self.cache, text);
        if processed.trim().is_empty() {
            return Vec::new();
        }
        split_message(&processed, DISCORD_MAX_MESSAGE_LEN)
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn send(&self, destination: Destination, text: &str) -> Result<(), GatewayError> {
        if destination == 0 {
            return Err(GatewayError::SendFailed {
                destination,
                message: "channel id must be non-zero".to_string(),
            });
        }
        let channel = ChannelId::new(destination);

        for chunk in self.prepare(text) {
            // Game text must never ping @everyone or roles.
            let message = CreateMessage::new()
                .content(chunk)
                .allowed_mentions(CreateAllowedMentions::new());
            channel.send_message(&self.http, message).await?;
        }
        Ok(())
    }
}
