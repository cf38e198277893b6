//! Message filtering with regex patterns.
//!
//! Block-lists per direction keep spam and unwanted lines from being
//! relayed between the game console and the chat channel.

use fancy_regex::Regex;
use tracing::warn;

/// Direction of message flow for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDirection {
    /// Console events going to chat.
    GameToChat,
    /// Chat messages going into the game.
    ChatToGame,
}

/// Message filter that checks messages against regex patterns.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    game_to_chat: Vec<CompiledPattern>,
    chat_to_game: Vec<CompiledPattern>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

impl MessageFilter {
    /// Build a filter from pattern strings.
    ///
    /// Invalid patterns are logged and skipped; config validation rejects
    /// them before a filter is ever built from a loaded file.
    pub fn new(game_to_chat: &[String], chat_to_game: &[String]) -> Self {
        Self {
            game_to_chat: compile_patterns(game_to_chat),
            chat_to_game: compile_patterns(chat_to_game),
        }
    }

    /// A filter that lets everything through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `message` matches any block pattern for `direction`.
    pub fn should_filter(&self, direction: FilterDirection, message: &str) -> bool {
        let patterns = match direction {
            FilterDirection::GameToChat => &self.game_to_chat,
            FilterDirection::ChatToGame => &self.chat_to_game,
        };

        patterns.iter().any(|p| {
            p.regex.is_match(message).unwrap_or_else(|e| {
                warn!("Regex match error for pattern '{}': {}", p.original, e);
                false
            })
        })
    }

    pub fn has_patterns(&self) -> bool {
        !self.game_to_chat.is_empty() || !self.chat_to_game.is_empty()
    }
}

fn compile_patterns(patterns: &[String]) -> Vec<CompiledPattern> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(CompiledPattern {
                original: pattern.clone(),
                regex,
            }),
            Err(e) => {
                warn!("Invalid filter regex pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_allows_all() {
        let filter = MessageFilter::empty();
        assert!(!filter.has_patterns());
        assert!(!filter.should_filter(FilterDirection::GameToChat, "[Srv] hi"));
        assert!(!filter.should_filter(FilterDirection::ChatToGame, "Alice: hi"));
    }

    #[test]
    fn test_directions_are_independent() {
        let filter = MessageFilter::new(&patterns(&["joined the game$"]), &patterns(&["^bot:"]));
        assert!(filter.should_filter(FilterDirection::GameToChat, "Bob joined the game"));
        assert!(!filter.should_filter(FilterDirection::ChatToGame, "Bob joined the game"));
        assert!(filter.should_filter(FilterDirection::ChatToGame, "bot: ping"));
        assert!(!filter.should_filter(FilterDirection::GameToChat, "bot: ping"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let filter = MessageFilter::new(&patterns(&["[invalid", "spam"]), &[]);
        assert!(filter.should_filter(FilterDirection::GameToChat, "spam spam"));
        assert!(!filter.should_filter(FilterDirection::GameToChat, "[invalid"));
    }

    #[test]
    fn test_lookaround_patterns() {
        // Block "rcon" mentions unless they are part of "rcon_password_hint".
        let filter = MessageFilter::new(&[], &patterns(&["(?i)rcon(?!_password_hint)"]));
        assert!(filter.should_filter(FilterDirection::ChatToGame, "Alice: RCON pls"));
        assert!(!filter.should_filter(FilterDirection::ChatToGame, "rcon_password_hint"));
    }
}
