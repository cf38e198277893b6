//! Console command syntax.

/// Password prompt the server sends right after accepting a connection.
pub const BANNER_MARKER: &str = "Enter password";

/// Substring the server sends back after a correct password.
pub const AUTH_SUCCESS_MARKER: &str = "Authentication successful";

/// Query for the server's display name. Replied to with `Value: <name>`.
pub const SERVER_NAME_QUERY: &str = "sv_name";

/// Prefix for every line of a multi-line message after the first.
pub const CONTINUATION_PREFIX: &str = "> ";

const SERVER_NAME_REPLY: &str = "Value: ";

/// Quote a string argument for the console parser.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '\\' | '"' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

/// Chat broadcast command for a single line.
pub fn say(line: &str) -> String {
    format!("say {}", quote(line))
}

/// Broadcast commands for a possibly multi-line message, in send order.
///
/// Whitespace-only lines are dropped.
pub fn say_lines(message: &str) -> Vec<String> {
    message
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                say(line)
            } else {
                say(&format!("{}{}", CONTINUATION_PREFIX, line))
            }
        })
        .collect()
}

/// Extract the server name from a `sv_name` reply line.
///
/// Only console output counts (`[Console]: Value: ..` on Teeworlds,
/// `.. I console: Value: ..` on DDNet), so a player typing `Value: x` in
/// chat can't rename the server.
pub fn parse_server_name(line: &str) -> Option<String> {
    let (source, value) = line.split_once(SERVER_NAME_REPLY)?;
    let source = source.trim_end().to_ascii_lowercase();
    let from_console = source.is_empty()
        || (!source.contains("chat")
            && (source.ends_with("[console]:") || source.ends_with(" i console:")));
    if !from_console {
        return None;
    }
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_say_quotes_and_escapes() {
        assert_eq!(say("hello"), r#"say "hello""#);
        assert_eq!(say(r#"he said "hi""#), r#"say "he said \"hi\"""#);
        assert_eq!(say(r"C:\path"), r#"say "C:\\path""#);
    }

    #[test]
    fn test_say_lines_single() {
        assert_eq!(say_lines("Alice: hello"), vec![r#"say "Alice: hello""#]);
    }

    #[test]
    fn test_say_lines_multi_line_uses_continuation() {
        assert_eq!(
            say_lines("Alice: hello\nworld\r\nagain"),
            vec![
                r#"say "Alice: hello""#,
                r#"say "> world""#,
                r#"say "> again""#,
            ]
        );
    }

    #[test]
    fn test_say_lines_skips_blank_lines() {
        assert_eq!(
            say_lines("\nAlice: hi\n   \nthere\n"),
            vec![r#"say "Alice: hi""#, r#"say "> there""#]
        );
        assert!(say_lines("").is_empty());
    }

    #[test]
    fn test_parse_server_name() {
        assert_eq!(
            parse_server_name("[Console]: Value: My DDNet Server").as_deref(),
            Some("My DDNet Server")
        );
        assert_eq!(
            parse_server_name("Value: unnamed server").as_deref(),
            Some("unnamed server")
        );
        assert_eq!(
            parse_server_name("2024-05-01 12:00:00 I console: Value: DDNet EU").as_deref(),
            Some("DDNet EU")
        );
        assert_eq!(parse_server_name("Value: "), None);
        assert_eq!(parse_server_name("[chat]: 0:-2:hi"), None);
    }

    #[test]
    fn test_parse_server_name_ignores_player_chat() {
        assert_eq!(parse_server_name("[chat]: 0:0:Eve: Value: FAKE"), None);
        assert_eq!(parse_server_name("[chat]: 0:0:[Console]: Value: FAKE"), None);
        assert_eq!(
            parse_server_name("2024-05-01 12:00:00 I chat: 0:-2:Eve: Value: FAKE"),
            None
        );
    }
}
