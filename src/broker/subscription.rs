//! Subscription index
//!
//! Holds the arena of `User` records keyed by username. Cross references are
//! plain indices (`UserId`, `TopicId`) so users and topics never own each
//! other.
//!
//! Keyword subscriptions are remembered per user. `subscribe_keyword` matches
//! them against the topics that exist now; `on_topic_created` matches every
//! remembered keyword against a topic that was just registered. Between the
//! two, a keyword catches a topic no matter which of them came first.

use std::collections::HashMap;

use crate::broker::topic::{Topic, TopicId, TopicRegistry};
use crate::broker::user::{User, UserId};

#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    users: Vec<User>,
    by_name: HashMap<String, UserId>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<UserId> {
        self.by_name.get(name).copied()
    }

    /// Look up `name`, creating the user if it has never been seen. The flag
    /// is `true` when the user was created by this call.
    pub fn get_or_create(&mut self, name: &str) -> (UserId, bool) {
        if let Some(id) = self.lookup(name) {
            return (id, false);
        }

        let id = self.users.len();
        self.users.push(User::new(id, name));
        self.by_name.insert(name.to_string(), id);
        (id, true)
    }

    /// Ids only come from this index, so an unknown id is a broker bug.
    pub fn user(&self, id: UserId) -> &User {
        &self.users[id]
    }

    pub fn user_mut(&mut self, id: UserId) -> &mut User {
        &mut self.users[id]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Returns `false` if `user` was already subscribed.
    pub fn subscribe_topic(&mut self, user: UserId, topic: TopicId) -> bool {
        self.user_mut(user).subscribe(topic)
    }

    pub fn unsubscribe_topic(&mut self, user: UserId, topic: TopicId) -> bool {
        self.user_mut(user).unsubscribe(topic)
    }

    pub fn unsubscribe_all(&mut self, user: UserId) {
        self.user_mut(user).clear_subscriptions();
    }

    pub fn is_subscribed(&self, user: UserId, topic: TopicId) -> bool {
        self.user(user).is_subscribed(topic)
    }

    /// Remember `keyword` for `user` and subscribe it to every existing topic
    /// carrying that keyword. Returns how many subscriptions were added.
    pub fn subscribe_keyword(&mut self, user: UserId, keyword: &str, topics: &TopicRegistry) -> usize {
        let record = self.user_mut(user);
        let added = topics
            .with_keyword(keyword)
            .filter(|topic| record.subscribe(topic.id))
            .count();
        record.remember_keyword(keyword);
        added
    }

    /// Run once per newly registered topic: subscribe every user whose
    /// remembered keywords intersect the topic's keyword set.
    pub fn on_topic_created(&mut self, topic: &Topic) -> usize {
        let mut added = 0;
        for user in self.users.iter_mut() {
            if topic.matches_any(user.keywords()) && user.subscribe(topic.id) {
                added += 1;
            }
        }
        added
    }

    /// Users subscribed to `topic`.
    pub fn subscribers(&self, topic: TopicId) -> impl Iterator<Item = &User> {
        self.users.iter().filter(move |u| u.is_subscribed(topic))
    }
}
