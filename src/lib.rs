//! # keysub
//!
//! `keysub` is a minimal, in-memory publish/subscribe broker. Clients log in
//! with a free-form username, advertise topics tagged with keywords, publish
//! events under a topic, and subscribe either to topics by name or to
//! keywords that also catch topics advertised later. Events for subscribers
//! that are offline are cached and replayed on their next login.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, subscription index, sessions, notification
//!   and the per-line command dispatcher.
//! - `client`: the broker-side handle of one live connection.
//! - `config`: runtime settings.
//! - `transport`: the WebSocket server feeding lines to the dispatcher.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
