//! Discord message event handling.
//!
//! Turns channel messages into console text and hands them to whichever
//! relays are subscribed to that channel.

use std::sync::Arc;

use serenity::async_trait;
use serenity::cache::Cache;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::bridge::SubscriberRegistry;
use crate::common::ChatMessage;
use crate::discord::commands::CommandHandler;
use crate::discord::resolver::MessageResolver;
use crate::game::formatter::{FormatContext, MessageFormatter};

/// Marker prepended when a message carries attachments the game can't show.
const MEDIA_MARKER: &str = "[MEDIA]";

/// Discord event handler.
pub struct BridgeHandler {
    registry: Arc<SubscriberRegistry>,
    resolver: MessageResolver,
    formatter: MessageFormatter,
    /// `None` when commands are disabled.
    command_handler: Option<CommandHandler>,
}

impl BridgeHandler {
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        resolver: MessageResolver,
        formatter: MessageFormatter,
        enable_commands: bool,
    ) -> Self {
        let command_handler = enable_commands.then(|| CommandHandler::new(Arc::clone(&registry)));
        Self {
            registry,
            resolver,
            formatter,
            command_handler,
        }
    }

    /// Console text for a chat message, or `None` if nothing is left to send.
    fn render(&self, cache: &Cache, chat: &ChatMessage) -> Option<String> {
        let content = self.resolver.process_chat_to_game(cache, &chat.content);
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(
            self.formatter
                .format(&FormatContext::new(content).with_user(&chat.sender)),
        )
    }
}

/// Member nickname, then global display name, then account name.
fn display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone())
}

/// Message body with the media marker prepended when attachments are present.
fn message_content(content: &str, has_attachments: bool) -> String {
    match (has_attachments, content.is_empty()) {
        (false, _) => content.to_string(),
        (true, true) => MEDIA_MARKER.to_string(),
        (true, false) => format!("{} {}", MEDIA_MARKER, content),
    }
}

#[async_trait]
impl EventHandler for BridgeHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore our own messages
        if msg.author.id == ctx.cache.current_user().id {
            return;
        }

        // Ignore bots
        if msg.author.bot {
            return;
        }

        // Only handle guild (server) messages
        if msg.guild_id.is_none() {
            return;
        }

        let content = msg.content.trim();
        if content.is_empty() && msg.attachments.is_empty() {
            return;
        }

        // Check for commands first
        if let Some(commands) = &self.command_handler {
            if content.starts_with('!') {
                match commands.handle_command(&ctx, &msg, content).await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(e) => {
                        error!("Command handler error: {}", e);
                        return;
                    }
                }
            }
        }

        let chat = ChatMessage {
            sender: display_name(&msg),
            content: message_content(content, !msg.attachments.is_empty()),
            destination: msg.channel_id.get(),
        };
        if self.registry.subscribers(chat.destination).await.is_empty() {
            return;
        }

        let Some(text) = self.render(&ctx.cache, &chat) else {
            return;
        };
        let delivered = self.registry.dispatch(chat.destination, &text).await;
        debug!(
            channel = chat.destination,
            "Discord -> game ({} relays): {}", delivered, text
        );
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {} ({} guilds)",
            ready.user.name,
            ready.guilds.len()
        );
    }
}
