pub mod command;
pub mod dispatcher;
pub mod engine;
pub mod event;
pub mod session;
pub mod subscription;
pub mod topic;
pub mod user;

pub use command::Command;
pub use dispatcher::EXIT_REPLY;
pub use engine::{Broker, SharedBroker, lock};
pub use event::Event;

#[cfg(test)]
mod tests;
