//! Command dispatcher
//!
//! `Broker::handle` is the single entry point for a line received on a
//! connection. Every `BrokerError` is recovered here and turned into reply
//! text; a bad command never closes the connection.

use tracing::{debug, info};

use crate::broker::command::Command;
use crate::broker::engine::Broker;
use crate::broker::event::Event;
use crate::broker::user::UserId;
use crate::utils::error::BrokerError;

/// Reply to `exit`. The transport closes the connection after sending it.
pub const EXIT_REPLY: &str = "exit good";

impl Broker {
    /// Run one command line for `identity` and return the reply text.
    pub fn handle(&mut self, identity: &str, line: &str) -> String {
        match self.dispatch(identity, line) {
            Ok(reply) => reply,
            Err(err) => {
                debug!(%identity, error = ?err, "command rejected");
                err.to_string()
            }
        }
    }

    fn dispatch(&mut self, identity: &str, line: &str) -> Result<String, BrokerError> {
        let command = Command::parse(line)?;
        debug!(%identity, user = ?self.username_of(identity), ?command, "dispatching");

        match command {
            Command::Login { username } => Ok(self.login(identity, &username)),
            Command::Exit => {
                info!(%identity, "client requested disconnect");
                Ok(EXIT_REPLY.to_string())
            }
            command => {
                let user = self.sessions.user_of(identity).ok_or(BrokerError::NoUser)?;
                self.execute(user, command)
            }
        }
    }

    fn login(&mut self, identity: &str, username: &str) -> String {
        let (user, created) = self.subscriptions.get_or_create(username);
        self.bind_identity(identity, user);

        if created {
            info!(%identity, %username, "user created");
            return "User created.".to_string();
        }

        let backlog = self.subscriptions.user_mut(user).drain_cache();
        info!(%identity, %username, replayed = backlog.len(), "user logged in");

        let mut reply = String::from("Login successful. Welcome back.");
        for event in backlog {
            reply.push_str("\n     ");
            reply.push_str(&event.to_string());
        }
        reply
    }

    fn execute(&mut self, user: UserId, command: Command) -> Result<String, BrokerError> {
        match command {
            Command::Publish {
                topic,
                title,
                content,
            } => {
                let topic = self.topics.lookup(&topic).ok_or(BrokerError::UnknownTopic)?;
                let event = Event::new(topic, &title, &content);
                self.notify(event);
                Ok("Event Published".to_string())
            }
            Command::Advertise { topic, keywords } => {
                self.advertise(&topic, keywords)?;
                Ok("Topic Created.".to_string())
            }
            Command::SubscribeTopic { topic } => {
                let id = self
                    .topics
                    .lookup(&topic)
                    .map(|t| t.id)
                    .ok_or_else(|| BrokerError::NoSuchTopic(topic.clone()))?;
                if !self.subscriptions.subscribe_topic(user, id) {
                    return Err(BrokerError::AlreadySubscribed(topic));
                }
                Ok(format!("You are subscribed to topic: {topic}"))
            }
            Command::SubscribeKeywords { keywords } => {
                let added: usize = keywords
                    .iter()
                    .map(|k| self.subscriptions.subscribe_keyword(user, k, &self.topics))
                    .sum();
                debug!(user = %self.subscriptions.user(user).name, added, "keyword subscription");
                Ok(format!(
                    "Subscribed to all topics with keywords: {}",
                    keywords.join(",")
                ))
            }
            Command::UnsubscribeAll => {
                if !self.subscriptions.user(user).has_subscriptions() {
                    return Err(BrokerError::NothingSubscribed);
                }
                self.subscriptions.unsubscribe_all(user);
                Ok("Unsubscribed from all topics".to_string())
            }
            Command::Unsubscribe { topic } => {
                if self.subscriptions.user(user).topics().is_empty() {
                    return Err(BrokerError::NothingSubscribed);
                }
                let id = self
                    .topics
                    .lookup(&topic)
                    .map(|t| t.id)
                    .ok_or_else(|| BrokerError::UnsubscribeUnknown(topic.clone()))?;
                if !self.subscriptions.unsubscribe_topic(user, id) {
                    return Err(BrokerError::NotSubscribed(topic));
                }
                Ok("Unsubscribed successfully".to_string())
            }
            Command::ListAllTopics => Ok(self.list_all_topics()),
            Command::ListSubscribedTopics => Ok(self.list_subscribed_topics(user)),
            // session commands never reach here
            Command::Login { .. } | Command::Exit => Err(BrokerError::Usage),
        }
    }

    fn list_all_topics(&self) -> String {
        if self.topics.is_empty() {
            return "No topics exist.".to_string();
        }
        let mut out = String::from("All Topics:");
        for topic in self.topics.all() {
            out.push_str("\n    ");
            out.push_str(&topic.to_string());
        }
        out
    }

    fn list_subscribed_topics(&self, user: UserId) -> String {
        let subscribed = self.subscriptions.user(user).topics();
        if subscribed.is_empty() {
            return "No subscribed topics to display.".to_string();
        }
        let mut out = String::from("Subscribed Topics:");
        for topic in subscribed.iter().filter_map(|id| self.topics.get(*id)) {
            out.push_str("\n    ");
            out.push_str(&topic.to_string());
        }
        out
    }
}
