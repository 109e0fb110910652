//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `keysub` application.
//!
//! It holds the error types shared by the broker and the transport, and the
//! logging bootstrap used by the binary and the tests.

pub mod error;
pub mod logging;
