//! Command line parsing
//!
//! A request is one line: the command word followed by at most three
//! argument fields. The last field keeps the rest of the line verbatim, so
//! event content may contain spaces.

use std::str::FromStr;

use crate::utils::error::BrokerError;

/// Most fields a line is split into, command word included.
const MAX_FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        username: String,
    },
    Publish {
        topic: String,
        title: String,
        content: String,
    },
    Advertise {
        topic: String,
        keywords: Vec<String>,
    },
    SubscribeTopic {
        topic: String,
    },
    SubscribeKeywords {
        keywords: Vec<String>,
    },
    Unsubscribe {
        topic: String,
    },
    UnsubscribeAll,
    ListAllTopics,
    ListSubscribedTopics,
    Exit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, BrokerError> {
        let fields = split_fields(line, MAX_FIELDS);
        let (word, args) = fields.split_first().ok_or(BrokerError::Usage)?;

        let command = match (*word, args) {
            ("login", [username, ..]) => Command::Login {
                username: username.to_string(),
            },
            ("publish", [topic, title, content]) => Command::Publish {
                topic: topic.to_string(),
                title: title.to_string(),
                content: content.to_string(),
            },
            ("advertise", [topic, keywords, ..]) => Command::Advertise {
                topic: topic.to_string(),
                keywords: non_empty(parse_keywords(keywords))?,
            },
            ("subscribe", ["topic", topic, ..]) => Command::SubscribeTopic {
                topic: topic.to_string(),
            },
            ("subscribe", ["keywords", keywords, ..]) => Command::SubscribeKeywords {
                keywords: non_empty(parse_keywords(keywords))?,
            },
            ("subscribe", [selector, _, ..]) if *selector != "topic" && *selector != "keywords" => {
                return Err(BrokerError::InvalidSelector);
            }
            ("unsubscribe", ["*", ..]) => Command::UnsubscribeAll,
            ("unsubscribe", [topic, ..]) => Command::Unsubscribe {
                topic: topic.to_string(),
            },
            ("listAllTopics", _) => Command::ListAllTopics,
            ("listSubscribedTopics", []) => Command::ListSubscribedTopics,
            ("exit", _) => Command::Exit,
            _ => return Err(BrokerError::Usage),
        };

        Ok(command)
    }
}

impl FromStr for Command {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split on whitespace into at most `max` fields. The final field is the
/// untouched remainder of the line.
pub fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim();

    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest);
            break;
        }
        match rest.split_once(char::is_whitespace) {
            Some((head, tail)) => {
                fields.push(head);
                rest = tail.trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

/// Comma separated keywords: trimmed, empties dropped, duplicates collapsed.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for keyword in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }
    keywords
}

fn non_empty(keywords: Vec<String>) -> Result<Vec<String>, BrokerError> {
    if keywords.is_empty() {
        Err(BrokerError::Usage)
    } else {
        Ok(keywords)
    }
}
