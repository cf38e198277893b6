//! Console line classification per server dialect.
//!
//! Each dialect has a fixed, ordered list of rules. A line is matched
//! against them in order and the first matching rule decides the event
//! text. Lines no rule matches are not relayed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use fancy_regex::{Captures, Regex};
use tracing::{trace, warn};

/// Server flavour, selecting which log formats the console emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Vanilla Teeworlds.
    Teeworlds,
    /// TrainFNG mod (timestamped `[time][chat]` lines).
    TrainFng,
    /// DDNet (`<date> I chat:` lines).
    DDNet,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Teeworlds, Dialect::TrainFng, Dialect::DDNet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teeworlds => "teeworlds",
            Self::TrainFng => "trainfng",
            Self::DDNet => "ddnet",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown server type '{}' (use one of: teeworlds, trainfng, ddnet)",
                    s
                )
            })
    }
}

type Extract = fn(&Captures<'_>) -> String;

/// Uncompiled rule as written in the tables below.
struct RuleSpec {
    name: &'static str,
    pattern: &'static str,
    extract: Extract,
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map(|m| m.as_str()).unwrap_or_default()
}

fn chat_message(caps: &Captures<'_>) -> String {
    group(caps, 1).trim_end().to_string()
}

fn joined(caps: &Captures<'_>) -> String {
    format!("{} joined the game", group(caps, 1))
}

fn left(caps: &Captures<'_>) -> String {
    format!("{} left the game", group(caps, 1))
}

/// Server notices of the form `*** 'name' entered and joined the game`.
fn server_notice(caps: &Captures<'_>) -> String {
    format!("{} {}", group(caps, 1), group(caps, 2).trim_end())
}

const TEEWORLDS_RULES: &[RuleSpec] = &[
    RuleSpec {
        name: "chat",
        pattern: r"\[chat\]: \d+:-?\d+:(.*)",
        extract: chat_message,
    },
    RuleSpec {
        name: "join",
        pattern: r"\[game\]: team_join player='\d+:(.*)'.*=\d+",
        extract: joined,
    },
    RuleSpec {
        name: "leave",
        pattern: r"\[game\]: leave player='\d+:(.*)'",
        extract: left,
    },
];

const TRAINFNG_RULES: &[RuleSpec] = &[
    RuleSpec {
        name: "chat",
        pattern: r"\[.*?\]\[chat\]: \d+:-?\d+:(.*)",
        extract: chat_message,
    },
    RuleSpec {
        name: "notice",
        pattern: r"\[.*\]\[.*\]: \*\*\* '(.*)' (.*)",
        extract: server_notice,
    },
];

const DDNET_RULES: &[RuleSpec] = &[
    RuleSpec {
        name: "chat",
        pattern: r".* I chat: \d+:-?\d+:(.*)",
        extract: chat_message,
    },
    RuleSpec {
        name: "notice",
        pattern: r".* I chat: \*\*\* '(.*)' (.*)",
        extract: server_notice,
    },
];

fn rule_specs(dialect: Dialect) -> &'static [RuleSpec] {
    match dialect {
        Dialect::Teeworlds => TEEWORLDS_RULES,
        Dialect::TrainFng => TRAINFNG_RULES,
        Dialect::DDNet => DDNET_RULES,
    }
}

struct Rule {
    name: &'static str,
    regex: Regex,
    extract: Extract,
}

/// Compiled rule tables for every dialect.
///
/// Built once at startup and shared read-only between relays.
pub struct Classifier {
    rules: HashMap<Dialect, Vec<Rule>>,
}

impl Classifier {
    /// Compile the rule tables.
    pub fn new() -> Result<Self, fancy_regex::Error> {
        let mut rules = HashMap::new();
        for dialect in Dialect::ALL {
            let compiled = rule_specs(dialect)
                .iter()
                .map(|spec| {
                    Ok(Rule {
                        name: spec.name,
                        regex: Regex::new(spec.pattern)?,
                        extract: spec.extract,
                    })
                })
                .collect::<Result<Vec<_>, fancy_regex::Error>>()?;
            rules.insert(dialect, compiled);
        }
        Ok(Self { rules })
    }

    /// Turn one raw console line into the event text to relay, if any.
    ///
    /// The first rule whose pattern matches decides the outcome, even when
    /// its extraction comes out blank.
    pub fn classify(&self, dialect: Dialect, line: &str) -> Option<String> {
        let rules = self.rules.get(&dialect)?;
        for rule in rules {
            let caps = match rule.regex.captures(line) {
                Ok(Some(caps)) => caps,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%dialect, rule = rule.name, "Regex match error: {}", e);
                    continue;
                }
            };
            let text = (rule.extract)(&caps);
            trace!(%dialect, rule = rule.name, "Classified console line: {}", text);
            return Some(text).filter(|t| !t.trim().is_empty());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new().expect("rule tables compile")
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("ddnet".parse::<Dialect>(), Ok(Dialect::DDNet));
        assert_eq!("TrainFNG".parse::<Dialect>(), Ok(Dialect::TrainFng));
        assert_eq!(" teeworlds ".parse::<Dialect>(), Ok(Dialect::Teeworlds));
        assert!("minecraft".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_teeworlds_fixtures() {
        let c = classifier();
        let cases = [
            ("[chat]: 3:-2:hi there", Some("hi there")),
            ("[5f3a2b1c][chat]: 0:0:nameless tee: gg", Some("nameless tee: gg")),
            (
                "[game]: team_join player='5:Bob' team=0",
                Some("Bob joined the game"),
            ),
            ("[game]: leave player='5:Bob'", Some("Bob left the game")),
            ("[server]: player has entered the game. ClientID=5", None),
            ("[game]: kill killer='1:A' victim='2:B' weapon=3 special=0", None),
        ];
        for (line, expected) in cases {
            assert_eq!(
                c.classify(Dialect::Teeworlds, line).as_deref(),
                expected,
                "line: {}",
                line
            );
        }
    }

    #[test]
    fn test_trainfng_fixtures() {
        let c = classifier();
        let cases = [
            ("[61d4b5a0][chat]: 1:0:Alice: gg", Some("Alice: gg")),
            (
                "[61d4b5a0][chat]: *** 'Bob' entered and joined the game",
                Some("Bob entered and joined the game"),
            ),
            (
                "[61d4b5a0][server]: *** 'Bob' has left the game",
                Some("Bob has left the game"),
            ),
            ("[chat]: 3:-2:no timestamp", None),
            ("[61d4b5a0][server]: client dropped. cid=1", None),
        ];
        for (line, expected) in cases {
            assert_eq!(
                c.classify(Dialect::TrainFng, line).as_deref(),
                expected,
                "line: {}",
                line
            );
        }
    }

    #[test]
    fn test_ddnet_fixtures() {
        let c = classifier();
        let cases = [
            ("2024-03-01 18:22:05 I chat: 0:-2:Alice: hi", Some("Alice: hi")),
            (
                "2024-03-01 18:22:07 I chat: *** 'Bob' entered and joined the game",
                Some("Bob entered and joined the game"),
            ),
            (
                "2024-03-01 18:30:00 I chat: *** 'Bob' has left the game",
                Some("Bob has left the game"),
            ),
            ("2024-03-01 18:22:05 I server: player has entered the game", None),
            ("[chat]: 3:-2:teeworlds line", None),
        ];
        for (line, expected) in cases {
            assert_eq!(
                c.classify(Dialect::DDNet, line).as_deref(),
                expected,
                "line: {}",
                line
            );
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let c = classifier();
        // Chat rule comes first, so a player typing a notice-looking message
        // is relayed verbatim rather than as a join.
        assert_eq!(
            c.classify(Dialect::TrainFng, "[t][chat]: 0:0:*** 'Eve' joined")
                .as_deref(),
            Some("*** 'Eve' joined")
        );
    }

    #[test]
    fn test_blank_chat_message_is_dropped() {
        let c = classifier();
        assert_eq!(c.classify(Dialect::Teeworlds, "[chat]: 3:-2:   "), None);
    }

    #[test]
    fn test_classification_is_order_independent() {
        let c = classifier();
        let lines = [
            (Dialect::Teeworlds, "[game]: leave player='2:Zed'"),
            (Dialect::DDNet, "2024-03-01 18:22:05 I chat: 0:-2:x"),
            (Dialect::Teeworlds, "[chat]: 3:-2:hi there"),
            (Dialect::TrainFng, "[t][chat]: 1:0:y"),
        ];
        let forward: Vec<_> = lines.iter().map(|(d, l)| c.classify(*d, l)).collect();
        let mut backward: Vec<_> = lines.iter().rev().map(|(d, l)| c.classify(*d, l)).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }
}
