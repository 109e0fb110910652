//! The `transport` module is responsible for handling network communication
//! with clients over WebSockets.
//!
//! Each text frame a client sends is one command line; each reply and each
//! notification goes back as one text frame. The module accepts connections,
//! hands every line to the broker's dispatcher, and drains the per-connection
//! outbound queue onto the socket.

pub mod websocket;

pub use websocket::{bind, serve, start_websocket_server};
