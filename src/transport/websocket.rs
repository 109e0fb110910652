//! WebSocket transport
//!
//! Responsibilities:
//! - Accept TCP/WebSocket connections and enforce the connection cap. A slot
//!   is reserved at accept time, before the handshake, and released when the
//!   connection task ends
//! - Register a `Connection` per socket, identified by the peer address
//! - Run one reader per connection that feeds lines to `Broker::handle`
//! - Run one writer per connection that drains its outbound queue
//! - Tear the connection down exactly once, leaving the user's registry
//!   entries intact

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::{Semaphore, mpsc};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{EXIT_REPLY, SharedBroker, lock};
use crate::client::{Connection, Identity, Outbound};
use crate::config::Settings;
use crate::utils::error::TransportError;

pub async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    Ok(listener)
}

pub async fn start_websocket_server(
    broker: SharedBroker,
    settings: Settings,
) -> Result<(), TransportError> {
    let listener = bind(&settings.address()).await?;
    serve(listener, broker, settings).await
}

/// Accept loop. Only returns if the listener itself fails.
pub async fn serve(
    listener: TcpListener,
    broker: SharedBroker,
    settings: Settings,
) -> Result<(), TransportError> {
    let max_connections = settings.broker.max_connections;
    let slots = Arc::new(Semaphore::new(max_connections));

    loop {
        let (stream, peer) = listener.accept().await?;

        let Ok(permit) = slots.clone().try_acquire_owned() else {
            warn!(%peer, max_connections, "connection limit reached, rejecting");
            drop(stream);
            continue;
        };

        let broker = broker.clone();
        spawn(async move {
            if let Err(e) = handle_connection(stream, peer, broker).await {
                warn!(%peer, error = %e, "connection closed with error");
            }
            drop(permit);
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: SharedBroker,
) -> Result<(), TransportError> {
    let ws_stream = accept_async(stream).await?;
    let identity: Identity = peer.to_string();
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let connection = Connection::new(identity.clone(), tx);

    lock(&broker).register_connection(connection.clone());
    info!(%identity, "client connected");

    let writer = {
        let identity = identity.clone();
        spawn(async move {
            while let Some(frame) = rx.recv().await {
                let text = match frame {
                    Outbound::Text(text) => text,
                    Outbound::Close => {
                        let _ = ws_sender.close().await;
                        break;
                    }
                };
                if let Err(e) = ws_sender.send(WsMessage::text(text)).await {
                    warn!(%identity, error = %e, "failed to send message");
                    break;
                }
            }
            debug!(%identity, "send loop closed");
        })
    };

    let result = read_commands(&mut ws_receiver, &connection, &broker).await;

    // the registry's copy goes first, ours right after; the writer then
    // drains what is left and stops
    lock(&broker).remove_connection(&identity);
    drop(connection);
    let _ = writer.await;

    info!(%identity, "client disconnected");
    result
}

/// Feed each text frame to the dispatcher until the peer leaves or asks to.
async fn read_commands(
    ws_receiver: &mut SplitStream<WebSocketStream<TcpStream>>,
    connection: &Connection,
    broker: &SharedBroker,
) -> Result<(), TransportError> {
    while let Some(msg) = ws_receiver.next().await {
        match msg? {
            WsMessage::Text(text) => {
                // reply is queued under the lock so it cannot be overtaken
                // by fan-out triggered on another connection
                let mut broker = lock(broker);
                let reply = broker.handle(&connection.identity, text.as_str());
                let exit = reply == EXIT_REPLY;
                connection.send(reply);
                if exit {
                    connection.close();
                    return Ok(());
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
