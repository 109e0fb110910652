//! Session registry
//!
//! Tracks the live connections and which username, if any, each connection
//! identity is logged in as. A connection starts anonymous; `bind` moves it to
//! a user. Several identities may be bound to one user (multi-device).

use std::collections::HashMap;

use crate::broker::user::UserId;
use crate::client::{Connection, Identity};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    connections: HashMap<Identity, Connection>,
    bindings: HashMap<Identity, UserId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, connection: Connection) {
        self.connections
            .insert(connection.identity.clone(), connection);
    }

    /// Forget the connection and its binding. Returns the user it was bound to.
    pub fn disconnect(&mut self, identity: &str) -> Option<UserId> {
        self.connections.remove(identity);
        self.bindings.remove(identity)
    }

    /// Bind `identity` to `user`, returning the previous binding.
    pub fn bind(&mut self, identity: &str, user: UserId) -> Option<UserId> {
        self.bindings.insert(identity.to_string(), user)
    }

    pub fn user_of(&self, identity: &str) -> Option<UserId> {
        self.bindings.get(identity).copied()
    }

    /// Registered and its outbound queue still open.
    pub fn is_live(&self, identity: &str) -> bool {
        self.connections
            .get(identity)
            .is_some_and(Connection::is_open)
    }

    /// The live connections among `identities`.
    pub fn live_connections<'a, I>(&'a self, identities: I) -> Vec<&'a Connection>
    where
        I: IntoIterator<Item = &'a Identity>,
    {
        identities
            .into_iter()
            .filter_map(|id| self.connections.get(id))
            .filter(|conn| conn.is_open())
            .collect()
    }

    /// Send `text` to every live connection, logged in or not.
    pub fn broadcast(&self, text: &str) -> usize {
        self.connections
            .values()
            .filter(|conn| conn.send(text))
            .count()
    }

    /// Identities whose writer side has already gone away.
    pub fn closed_identities(&self) -> Vec<Identity> {
        self.connections
            .values()
            .filter(|conn| !conn.is_open())
            .map(|conn| conn.identity.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
