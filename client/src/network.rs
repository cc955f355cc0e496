//! Relay connection: handshake, receiver task and sender task
//!
//! The receiver owns the read half and only decodes frames into the
//! [`NetworkEventQueue`](crate::events::NetworkEventQueue). The sender owns
//! the write half and drains an outbound channel, so the simulation loop
//! queues messages without ever waiting on the socket.

use crate::error::ConnectionError;
use crate::events::{EventSender, InboundEvent};
use crate::framing::{read_message, write_message};
use log::{debug, error, info, warn};
use shared::{CodecError, Message};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Live connection to the relay.
pub struct RelayLink {
    client_id: u32,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Message>,
    receiver: JoinHandle<()>,
    sender: JoinHandle<()>,
}

impl RelayLink {
    /// Id the relay assigned to this connection.
    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queues a message for the sender task. Returns false once the sender
    /// has stopped.
    pub fn send(&self, message: Message) -> bool {
        if let Err(e) = self.outbound.send(message) {
            error!("Failed to queue {} message: sender stopped", e.0.kind());
            return false;
        }
        true
    }

    /// Stops both network tasks.
    pub fn shutdown(self) {
        self.receiver.abort();
        self.sender.abort();
    }
}

/// Connects to the relay, performs the `Hello`/`Welcome` handshake and
/// starts the network tasks. Inbound messages are pushed to `events`.
pub async fn connect(
    addr: &str,
    username: &str,
    connect_timeout: Duration,
    events: EventSender,
) -> Result<RelayLink, ConnectionError> {
    let peer = resolve(addr).await?;
    info!("Connecting to relay at {}...", peer);

    let stream = match timeout(connect_timeout, TcpStream::connect(peer)).await {
        Err(_) => return Err(ConnectionError::TimedOut(addr.to_string(), connect_timeout)),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            return Err(ConnectionError::Refused(addr.to_string()))
        }
        Ok(Err(e)) => return Err(ConnectionError::Io(e)),
        Ok(Ok(stream)) => stream,
    };
    stream.set_nodelay(true)?;

    let (mut reader, mut writer) = stream.into_split();
    let client_id = match timeout(
        connect_timeout,
        handshake(&mut reader, &mut writer, username),
    )
    .await
    {
        Err(_) => return Err(ConnectionError::TimedOut(addr.to_string(), connect_timeout)),
        Ok(result) => result?,
    };
    info!("Connected! Client ID: {}", client_id);

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let receiver = spawn_receiver(reader, events);
    let sender = spawn_sender(writer, outbound_rx);

    Ok(RelayLink {
        client_id,
        peer,
        outbound,
        receiver,
        sender,
    })
}

async fn resolve(addr: &str) -> Result<SocketAddr, ConnectionError> {
    let mut addrs = lookup_host(addr)
        .await
        .map_err(|_| ConnectionError::InvalidAddress(addr.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| ConnectionError::InvalidAddress(addr.to_string()))
}

async fn handshake(
    reader: &mut OwnedReadHalf,
    writer: &mut OwnedWriteHalf,
    username: &str,
) -> Result<u32, ConnectionError> {
    write_message(
        writer,
        &Message::Hello {
            username: username.to_string(),
        },
    )
    .await?;

    match read_message(reader).await {
        Ok(Message::Welcome { client_id }) => Ok(client_id),
        Ok(other) => Err(ConnectionError::Handshake(format!(
            "expected welcome, got {}",
            other.kind()
        ))),
        Err(CodecError::ConnectionClosed) => Err(ConnectionError::Handshake(
            "relay closed the connection".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Spawns the task that decodes inbound frames onto the event queue.
fn spawn_receiver(mut reader: OwnedReadHalf, events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match read_message(&mut reader).await {
                Ok(message) => {
                    debug!("Received {} message", message.kind());
                    if !events.push(InboundEvent::Message(message)) {
                        debug!("Event queue dropped, receiver exiting");
                        return;
                    }
                }
                Err(e @ (CodecError::Decode(_) | CodecError::FrameTooLarge(..))) => {
                    warn!("Dropping malformed message: {}", e);
                }
                Err(CodecError::ConnectionClosed) => {
                    info!("Relay closed the connection");
                    break;
                }
                Err(e) => {
                    error!("Error receiving from relay: {}", e);
                    break;
                }
            }
        }
        events.push(InboundEvent::RelayClosed);
    })
}

/// Spawns the task that writes queued messages to the relay.
fn spawn_sender(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = write_message(&mut writer, &message).await {
                error!("Failed to send {} message: {}", message.kind(), e);
                break;
            }
        }
    })
}
