//! Connection from a client process to the hangman server

use hangman_shared::{read_packet, write_packet, Packet, ADDR_ENV, DEFAULT_ADDR};
use log::{debug, info};
use std::io;
use thiserror::Error;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to server at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("lost connection to server")]
    ConnectionLost,
    #[error("unexpected packet from server: {0:?}")]
    UnexpectedPacket(Packet),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Server address from `HANGMAN_ADDR`, or the default local address
pub fn server_addr() -> String {
    std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string())
}

/// Framed stream to the server
///
/// Incoming frames are decoded by a background task and queued, so `recv` can
/// sit in a `select!` next to stdin without losing half-read frames.
pub struct Connection {
    writer: OwnedWriteHalf,
    inbound: mpsc::UnboundedReceiver<Packet>,
    reader: JoinHandle<()>,
}

impl Connection {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        info!("Connected to {}", addr);

        let (mut read_half, writer) = stream.into_split();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        let reader = tokio::spawn(async move {
            loop {
                match read_packet(&mut read_half).await {
                    Ok(Some(packet)) => {
                        if inbound_tx.send(packet).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        debug!("Error receiving packet: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Connection {
            writer,
            inbound,
            reader,
        })
    }

    pub async fn send(&mut self, packet: &Packet) -> Result<(), ClientError> {
        write_packet(&mut self.writer, packet).await?;
        Ok(())
    }

    /// Next packet from the server, `None` once the connection is gone
    ///
    /// Cancellation safe.
    pub async fn recv(&mut self) -> Option<Packet> {
        self.inbound.recv().await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
