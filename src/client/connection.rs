use tokio::sync::mpsc::UnboundedSender;

/// Transport-issued token naming one connection (the peer socket address).
pub type Identity = String;

/// Frames queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Represents a connected client as seen by the broker.
///
/// Pushing into `sender` never blocks; the connection's own writer task
/// drains the queue onto the socket, so a slow peer only delays itself.
///
/// The queue is unbounded. A peer that stays connected but never reads
/// keeps its frames in memory until it disconnects or the socket write
/// fails.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Identity issued by the transport for this connection.
    pub identity: Identity,

    sender: UnboundedSender<Outbound>,
}

impl Connection {
    pub fn new(identity: impl Into<Identity>, sender: UnboundedSender<Outbound>) -> Self {
        Self {
            identity: identity.into(),
            sender,
        }
    }

    /// Queue a text frame. Returns `false` once the writer side is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.sender.send(Outbound::Text(text.into())).is_ok()
    }

    /// Ask the writer task to close the socket after flushing queued frames.
    pub fn close(&self) {
        let _ = self.sender.send(Outbound::Close);
    }

    /// Point-in-time liveness: the writer task still holds the receiver.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}
