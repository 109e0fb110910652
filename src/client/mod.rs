//! The `client` module defines the broker's view of a connected client.
//!
//! It provides the `Connection` struct, the outbound half of one live
//! connection: its transport-issued identity and the channel the broker
//! pushes replies and notifications into.

pub mod connection;
pub use connection::{Connection, Identity, Outbound};
