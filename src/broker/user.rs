//! User aggregate
//!
//! A `User` owns everything the broker tracks per username: the identities
//! currently bound to it, its topic subscriptions, the keywords it asked to
//! follow, and the queue of events waiting for it to come back online.
//! All four collections are allocated together in `User::new`, so a user is
//! never observable half-initialized.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::broker::event::Event;
use crate::broker::topic::TopicId;
use crate::client::Identity;

pub type UserId = usize;

#[derive(Debug)]
pub struct User {
    pub id: UserId,
    pub name: String,
    identities: HashSet<Identity>,
    topics: Vec<TopicId>,
    keywords: Vec<String>,
    cache: VecDeque<Arc<Event>>,
}

impl User {
    pub fn new(id: UserId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            identities: HashSet::new(),
            topics: Vec::new(),
            keywords: Vec::new(),
            cache: VecDeque::new(),
        }
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter()
    }

    /// Bind an identity. Binding twice is a no-op.
    pub fn bind(&mut self, identity: &str) -> bool {
        self.identities.insert(identity.to_string())
    }

    pub fn unbind(&mut self, identity: &str) -> bool {
        self.identities.remove(identity)
    }

    /// Subscribed topics, in the order they were subscribed.
    pub fn topics(&self) -> &[TopicId] {
        &self.topics
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_subscribed(&self, topic: TopicId) -> bool {
        self.topics.contains(&topic)
    }

    /// Returns `false` if the subscription already existed.
    pub fn subscribe(&mut self, topic: TopicId) -> bool {
        if self.is_subscribed(topic) {
            return false;
        }
        self.topics.push(topic);
        true
    }

    pub fn unsubscribe(&mut self, topic: TopicId) -> bool {
        let before = self.topics.len();
        self.topics.retain(|t| *t != topic);
        self.topics.len() != before
    }

    pub fn remember_keyword(&mut self, keyword: &str) -> bool {
        if self.keywords.iter().any(|k| k == keyword) {
            return false;
        }
        self.keywords.push(keyword.to_string());
        true
    }

    /// Drop every topic subscription and every remembered keyword.
    pub fn clear_subscriptions(&mut self) {
        self.topics.clear();
        self.keywords.clear();
    }

    pub fn has_subscriptions(&self) -> bool {
        !self.topics.is_empty() || !self.keywords.is_empty()
    }

    /// Take the whole backlog, oldest first.
    pub fn drain_cache(&mut self) -> Vec<Arc<Event>> {
        self.cache.drain(..).collect()
    }

    /// Put events back at the front of the backlog, keeping their order.
    pub fn restore_cache(&mut self, events: Vec<Arc<Event>>) {
        for event in events.into_iter().rev() {
            self.cache.push_front(event);
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
