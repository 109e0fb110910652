//! Broker engine
//!
//! This module contains the in-memory broker implementation responsible for:
//! - registering topics and matching them against keyword subscriptions
//! - tracking which connection identities are logged in as which user
//! - fanning published events out to online subscribers
//! - caching events for offline subscribers until they come back
//!
//! Concurrency and usage notes:
//! - The public API here is synchronous and designed to be held behind a
//!   lock (`SharedBroker`). Every command runs start to finish under that
//!   lock, so "check online, then deliver or cache" and "register topic, then
//!   match keywords" never interleave with another connection's command.
//! - Delivery only pushes onto per-connection unbounded queues; nothing here
//!   waits on a socket while the lock is held.
//! - The liveness loop is designed to be run as a background task. It prunes
//!   connections whose writer has gone away and flushes backlogs of users
//!   that are online again.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::broker::event::Event;
use crate::broker::session::SessionRegistry;
use crate::broker::subscription::SubscriptionIndex;
use crate::broker::topic::{TopicId, TopicRegistry};
use crate::broker::user::{User, UserId};
use crate::client::{Connection, Identity};
use crate::utils::error::BrokerError;

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Lock the shared broker.
///
/// Poisoning means a command panicked halfway through a mutation; the
/// registries can no longer be trusted, so this fails loudly.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().expect("broker state poisoned by a panicked command")
}

/// Outcome of one `notify` call, counted per user.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub cached: usize,
}

/// Outcome of one liveness sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    pub pruned: usize,
    pub flushed: usize,
}

#[derive(Debug, Default)]
pub struct Broker {
    pub topics: TopicRegistry,
    pub subscriptions: SubscriptionIndex,
    pub sessions: SessionRegistry,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            topics: TopicRegistry::new(),
            subscriptions: SubscriptionIndex::new(),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn shared() -> SharedBroker {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Registers the outbound half of a freshly accepted connection.
    pub fn register_connection(&mut self, connection: Connection) {
        debug!(identity = %connection.identity, "connection registered");
        self.sessions.connect(connection);
    }

    /// Drops a connection. Its user keeps subscriptions and cache; only the
    /// binding of this identity goes away.
    pub fn remove_connection(&mut self, identity: &str) {
        if let Some(user) = self.sessions.disconnect(identity) {
            let record = self.subscriptions.user_mut(user);
            record.unbind(identity);
            debug!(%identity, user = %record.name, "identity unbound");
        }
    }

    /// Binds `identity` to `user`, releasing any previous binding.
    pub fn bind_identity(&mut self, identity: &str, user: UserId) {
        if let Some(previous) = self.sessions.bind(identity, user) {
            if previous != user {
                self.subscriptions.user_mut(previous).unbind(identity);
            }
        }
        self.subscriptions.user_mut(user).bind(identity);
    }

    pub fn username_of(&self, identity: &str) -> Option<&str> {
        self.sessions
            .user_of(identity)
            .map(|id| self.subscriptions.user(id).name.as_str())
    }

    /// Any bound identity of `user` has a live connection.
    pub fn is_online(&self, user: UserId) -> bool {
        self.subscriptions
            .user(user)
            .identities()
            .any(|id| self.sessions.is_live(id))
    }

    /// Registers a topic, subscribes every user whose remembered keywords
    /// match it, then announces it to every connected client.
    pub fn advertise(&mut self, name: &str, keywords: Vec<String>) -> Result<TopicId, BrokerError> {
        let topic = self.topics.create(name, keywords)?;
        let matched = self.subscriptions.on_topic_created(topic);
        let notice = format!("New Topic: {}\nKeywords: {}", topic.name, topic.keyword_list());
        let reached = self.sessions.broadcast(&notice);

        info!(
            topic = %topic.name,
            keywords = %topic.keyword_list(),
            matched,
            reached,
            "topic advertised"
        );
        Ok(topic.id)
    }

    /// Fans `event` out to subscribers of its topic.
    ///
    /// Per user, online-ness and the deliver-or-cache decision are taken in
    /// the same step. Users not subscribed to the topic are skipped entirely.
    /// An online user's existing backlog is sent ahead of the new event so
    /// each subscriber sees events in publish order.
    pub fn notify(&mut self, event: Event) -> Delivery {
        let event = Arc::new(event);
        let mut outcome = Delivery::default();
        let sessions = &self.sessions;

        for user in self.subscriptions.iter_mut() {
            if !user.is_subscribed(event.topic_id) {
                continue;
            }

            let mut pending = user.drain_cache();
            pending.push(event.clone());

            if deliver(sessions, user, &pending) {
                outcome.delivered += 1;
            } else {
                user.restore_cache(pending);
                outcome.cached += 1;
                debug!(user = %user.name, cached = user.cached(), "event cached");
            }
        }

        info!(
            topic = %event.topic,
            title = %event.title,
            id = event.id,
            delivered = outcome.delivered,
            cached = outcome.cached,
            "event published"
        );
        outcome
    }

    /// Point-in-time liveness check over every connection.
    pub fn sweep(&mut self) -> Sweep {
        let mut report = Sweep::default();

        for identity in self.sessions.closed_identities() {
            self.remove_connection(&identity);
            report.pruned += 1;
        }

        let sessions = &self.sessions;
        for user in self.subscriptions.iter_mut() {
            if user.cached() == 0 {
                continue;
            }
            let pending = user.drain_cache();
            if deliver(sessions, user, &pending) {
                report.flushed += 1;
            } else {
                user.restore_cache(pending);
            }
        }

        report
    }

    /// Runs `sweep` every `period` until the task is dropped.
    pub async fn start_liveness_loop(broker: SharedBroker, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = lock(&broker).sweep();
            if report.pruned > 0 || report.flushed > 0 {
                debug!(
                    pruned = report.pruned,
                    flushed = report.flushed,
                    "liveness sweep"
                );
            }
        }
    }

    /// Identities currently bound to `user`, for diagnostics.
    pub fn identities_of(&self, user: UserId) -> Vec<Identity> {
        self.subscriptions.user(user).identities().cloned().collect()
    }
}

/// Push `events` in order to every live identity of `user`. True if at least
/// one connection accepted all of them.
fn deliver(sessions: &SessionRegistry, user: &User, events: &[Arc<Event>]) -> bool {
    let live = sessions.live_connections(user.identities());
    if live.is_empty() {
        return false;
    }

    let accepted = live
        .iter()
        .filter(|conn| events.iter().all(|event| conn.send(event.to_string())))
        .count();

    if accepted < live.len() {
        warn!(
            user = %user.name,
            failed = live.len() - accepted,
            "push to a closing connection failed"
        );
    }
    accepted > 0
}
