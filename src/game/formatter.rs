//! Message formatting for display.
//!
//! Handles placeholder substitution in message format strings.
//! Supports placeholders: %time, %server, %user, %message

use chrono::Local;

/// Default format for game -> chat events.
pub const DEFAULT_GAME_TO_CHAT_FORMAT: &str = "[%server] %message";

/// Default format for chat -> game messages.
pub const DEFAULT_CHAT_TO_GAME_FORMAT: &str = "%user: %message";

const PLACEHOLDERS: [&str; 4] = ["%time", "%server", "%user", "%message"];

/// Message formatter that substitutes placeholders in format strings.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    format: String,
}

impl MessageFormatter {
    /// Create a new formatter with the given format string.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    pub fn game_to_chat_default() -> Self {
        Self::new(DEFAULT_GAME_TO_CHAT_FORMAT)
    }

    /// Format a message with the given context.
    ///
    /// Substitution is a single pass over the format string, so placeholder
    /// text inside the substituted values is left alone:
    /// - `%time` - Current local time (HH:MM:SS)
    /// - `%server` - Server the message belongs to
    /// - `%user` - Sender name
    /// - `%message` - The message content
    pub fn format(&self, ctx: &FormatContext) -> String {
        let mut out = String::with_capacity(self.format.len() + ctx.message.len());
        let mut rest = self.format.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            match PLACEHOLDERS.iter().find(|p| tail.starts_with(**p)) {
                Some(placeholder) => {
                    match *placeholder {
                        "%time" => out.push_str(&get_time()),
                        "%server" => out.push_str(&ctx.server),
                        "%user" => out.push_str(&ctx.user),
                        _ => out.push_str(&ctx.message),
                    }
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('%');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Context for message formatting.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    pub server: String,
    pub user: String,
    pub message: String,
}

impl FormatContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }
}

/// Get the current time as HH:MM:SS string.
fn get_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Find the last UTF-8 char boundary at or before `byte_index` in `s`.
fn floor_char_boundary(s: &str, byte_index: usize) -> usize {
    if byte_index >= s.len() {
        return s.len();
    }
    let mut i = byte_index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split a message into chunks of at most `max_len` bytes.
///
/// Prefers line breaks, then spaces, and never cuts a UTF-8 character.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = message.trim();

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let split_at = floor_char_boundary(remaining, max_len);
        if split_at == 0 {
            // max_len is smaller than the first character; emit it whole.
            let first_char_end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
            chunks.push(remaining[..first_char_end].to_string());
            remaining = remaining[first_char_end..].trim_start();
            continue;
        }

        let window = &remaining[..split_at];
        let (head, tail) = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(idx) if idx > 0 => (&remaining[..idx], &remaining[idx + 1..]),
            _ => (window, &remaining[split_at..]),
        };
        chunks.push(head.trim_end().to_string());
        remaining = tail.trim_start();
    }

    chunks
}
