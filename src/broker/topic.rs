//! Topic management
//!
//! A `Topic` is a named subject plus the keyword set it was advertised with.
//! Topics are immutable once registered and are never removed, so a
//! `TopicId` (the creation index) stays valid for the life of the broker.
//!
//! Concurrency note: callers must synchronize access to `TopicRegistry`
//! (for example via the broker lock) when registering topics.

use std::fmt;

use crate::utils::error::BrokerError;

pub type TopicId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub keywords: Vec<String>,
}

impl Topic {
    /// Create a topic. Duplicate keywords collapse, first occurrence wins.
    pub fn new<I, S>(id: TopicId, name: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.into();
            if !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }

        Self {
            id,
            name: name.to_string(),
            keywords: unique,
        }
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// True when any of `keywords` is part of this topic's keyword set.
    pub fn matches_any<'a, I>(&self, keywords: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        keywords.into_iter().any(|k| self.has_keyword(k))
    }

    /// Keywords rendered as `[a, b, c]`.
    pub fn keyword_list(&self) -> String {
        format!("[{}]", self.keywords.join(", "))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic [{}] with keywords {}", self.name, self.keyword_list())
    }
}

/// Every advertised topic, in creation order.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: Vec<Topic>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new topic. Names are unique; a second advertisement of the
    /// same name is rejected and the first topic is left untouched.
    pub fn create(&mut self, name: &str, keywords: Vec<String>) -> Result<&Topic, BrokerError> {
        if self.lookup(name).is_some() {
            return Err(BrokerError::TopicExists(name.to_string()));
        }

        let id = self.topics.len();
        self.topics.push(Topic::new(id, name, keywords));
        Ok(&self.topics[id])
    }

    /// Linear scan by name.
    pub fn lookup(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn get(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(id)
    }

    /// All topics in creation order.
    pub fn all(&self) -> &[Topic] {
        &self.topics
    }

    /// Topics whose keyword set contains `keyword`.
    pub fn with_keyword<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Topic> + 'a {
        self.topics.iter().filter(move |t| t.has_keyword(keyword))
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
