//! Emoji, mention, and markdown translation.
//!
//! Game consoles only handle plain text, so Discord markup is flattened on
//! the way in, and emoji shortcodes typed in game are expanded on the way out.

use std::collections::HashMap;

use fancy_regex::{Captures, Regex};
use serenity::cache::Cache;
use serenity::model::id::{ChannelId, RoleId, UserId};

/// Message resolver for game <-> Discord text translation.
#[derive(Debug, Clone)]
pub struct MessageResolver {
    /// `:name:` shortcodes typed in game.
    shortcode_pattern: Regex,
    /// Discord user mentions (<@123> or <@!123>).
    mention_pattern: Regex,
    /// Discord channel mentions (<#123>).
    channel_pattern: Regex,
    /// Discord role mentions (<@&123>).
    role_pattern: Regex,
    /// Discord custom emojis (<:name:id> or <a:name:id>).
    custom_emoji_pattern: Regex,
    /// Whether to enable markdown (disable escaping).
    enable_markdown: bool,
}

impl MessageResolver {
    pub fn new(enable_markdown: bool) -> Result<Self, fancy_regex::Error> {
        Ok(Self {
            shortcode_pattern: Regex::new(r":([a-zA-Z0-9_+\-]+):")?,
            mention_pattern: Regex::new(r"<@!?(\d+)>")?,
            channel_pattern: Regex::new(r"<#(\d+)>")?,
            role_pattern: Regex::new(r"<@&(\d+)>")?,
            custom_emoji_pattern: Regex::new(r"<a?:([a-zA-Z0-9_]+):\d+>")?,
            enable_markdown,
        })
    }

    /// Escape Discord markdown special characters.
    pub fn escape_markdown(&self, message: &str) -> String {
        if self.enable_markdown {
            return message.to_string();
        }
        let mut escaped = String::with_capacity(message.len());
        for ch in message.chars() {
            if matches!(ch, '\\' | '`' | '*' | '_' | '~' | '|') {
                escaped.push('\\');
            }
            escaped.push(ch);
        }
        escaped
    }

    /// Prepare a game event for posting to Discord.
    ///
    /// Known `:shortcodes:` become server or Unicode emoji; everything else
    /// is markdown-escaped.
    pub fn process_game_to_chat(&self, cache: &Cache, message: &str) -> String {
        let custom = custom_emoji_map(cache);
        let mut result = String::with_capacity(message.len());
        let mut last = 0;

        let mut pos = 0;
        while let Ok(Some(caps)) = self.shortcode_pattern.captures_from_pos(message, pos) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            pos = whole.end();

            let lower = name.as_str().to_lowercase();
            let replacement = custom
                .get(&lower)
                .cloned()
                .or_else(|| emojis::get_by_shortcode(&lower).map(|e| e.as_str().to_string()));
            if let Some(replacement) = replacement {
                result.push_str(&self.escape_markdown(&message[last..whole.start()]));
                result.push_str(&replacement);
                last = whole.end();
            }
        }
        result.push_str(&self.escape_markdown(&message[last..]));
        result
    }

    /// Prepare a Discord message for the game console.
    pub fn process_chat_to_game(&self, cache: &Cache, message: &str) -> String {
        let text = self.resolve_custom_emojis_to_text(message);
        let text = resolve_unicode_emojis_to_text(&text);
        let text = self.resolve_mentions_to_text(&text, cache);
        let text = self.resolve_channel_mentions(&text, cache);
        self.resolve_role_mentions(&text, cache)
    }

    /// Convert Discord custom emojis to `:name:`.
    pub fn resolve_custom_emojis_to_text(&self, message: &str) -> String {
        self.custom_emoji_pattern
            .replace_all(message, ":$1:")
            .to_string()
    }

    /// Convert <@123456789> to @username.
    pub fn resolve_mentions_to_text(&self, message: &str, cache: &Cache) -> String {
        self.mention_pattern
            .replace_all(message, |caps: &Captures| -> String {
                caps[1]
                    .parse::<u64>()
                    .ok()
                    .and_then(|id| cache.user(UserId::new(id)).map(|u| format!("@{}", u.name)))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }

    /// Convert <#123456789> to #channel-name.
    pub fn resolve_channel_mentions(&self, message: &str, cache: &Cache) -> String {
        self.channel_pattern
            .replace_all(message, |caps: &Captures| -> String {
                if let Ok(id) = caps[1].parse::<u64>() {
                    let channel_id = ChannelId::new(id);
                    for guild_id in cache.guilds() {
                        if let Some(guild) = cache.guild(guild_id) {
                            if let Some(channel) = guild.channels.get(&channel_id) {
                                return format!("#{}", channel.name);
                            }
                        }
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    /// Convert <@&123456789> to @role-name.
    pub fn resolve_role_mentions(&self, message: &str, cache: &Cache) -> String {
        self.role_pattern
            .replace_all(message, |caps: &Captures| -> String {
                if let Ok(id) = caps[1].parse::<u64>() {
                    let role_id = RoleId::new(id);
                    for guild_id in cache.guilds() {
                        if let Some(guild) = cache.guild(guild_id) {
                            if let Some(role) = guild.roles.get(&role_id) {
                                return format!("@{}", role.name);
                            }
                        }
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }
}

/// Lower-cased custom emoji names of every cached guild, mapped to their markup.
fn custom_emoji_map(cache: &Cache) -> HashMap<String, String> {
    cache
        .guilds()
        .iter()
        .filter_map(|guild_id| cache.guild(*guild_id))
        .flat_map(|guild| {
            guild
                .emojis
                .iter()
                .map(|(id, emoji)| {
                    let markup = if emoji.animated {
                        format!("<a:{}:{}>", emoji.name, id)
                    } else {
                        format!("<:{}:{}>", emoji.name, id)
                    };
                    (emoji.name.to_lowercase(), markup)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Longest emoji sequence (ZWJ joins, skin tones, flags) tried at each position.
const MAX_EMOJI_CHARS: usize = 10;

/// Convert Unicode emojis to `:shortcode:` text, e.g. 😂 -> :joy:.
///
/// Falls back to the emoji's name when it has no shortcode.
pub fn resolve_unicode_emojis_to_text(message: &str) -> String {
    let chars: Vec<char> = message.chars().collect();
    let mut result = String::with_capacity(message.len());
    let mut i = 0;

    'outer: while i < chars.len() {
        if !chars[i].is_ascii() {
            let longest = MAX_EMOJI_CHARS.min(chars.len() - i);
            for len in (1..=longest).rev() {
                let candidate: String = chars[i..i + len].iter().collect();
                if let Some(emoji) = emojis::get(&candidate) {
                    result.push(':');
                    result.push_str(emoji.shortcode().unwrap_or_else(|| emoji.name()));
                    result.push(':');
                    i += len;
                    continue 'outer;
                }
            }
        }
        result.push(chars[i]);
        i += 1;
    }

    result
}
