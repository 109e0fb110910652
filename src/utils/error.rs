//! The `error` module defines the error types used within the `keysub` application.
//!
//! `BrokerError` covers every condition a client can trigger with a command.
//! Its `Display` output is the exact reply text sent back over the wire, so
//! the dispatcher can recover any of them with `to_string()`.
//!
//! `TransportError` covers faults of a single connection. Those end the
//! connection's worker and nothing else.

use thiserror::Error;

/// Help text returned for any malformed or unknown command.
pub const USAGE: &str = "Incorrect input. \n\
Usage:\tpublish TopicName EventTitle all of my content here \n\
\t\tadvertise TopicName keyword1,keyword2,keyword3 \n\
\t\tsubscribe topic TopicName \n\
\t\tsubscribe keywords keyword1,keyword2,keyword3 \n\
\t\tunsubscribe TopicName \n\
\t\tunsubscribe * \n\
\t\tlistSubscribedTopics \n\
\t\tlistAllTopics \n\
\t\tlogin UserName \n\
\t\texit \n\
\t\tSeparate keywords by commas, no spaces needed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("{}", USAGE)]
    Usage,

    #[error(
        "No user found for this connection. Please type 'login <userName>' to create a user or log in."
    )]
    NoUser,

    /// Publishing against a topic nobody advertised.
    #[error("Topic does not exist.")]
    UnknownTopic,

    #[error("Error: Topic {0} does not exist.")]
    NoSuchTopic(String),

    #[error("Error: Topic {0} already exists.")]
    TopicExists(String),

    #[error("Error: Already subscribed to topic {0}.")]
    AlreadySubscribed(String),

    #[error("Invalid syntax. Must specify 'topic' or 'keywords'.")]
    InvalidSelector,

    #[error("No subscribed topics")]
    NothingSubscribed,

    #[error("Topic {0} does not exist.")]
    UnsubscribeUnknown(String),

    #[error("Topic {0} not in subscriptions")]
    NotSubscribed(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}
