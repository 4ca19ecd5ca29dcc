//! Short-lived protocol clients.
//!
//! Every request opens a fresh connection, sends one buffer, reads at most
//! one reply and closes. This is what the CLI uses for `stop`/`restart` and
//! queries, and what the simulated-mode peer link uses to talk to its peer.
//!
//! None of these calls carry their own timeout; a stalled peer stalls the
//! caller.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use fridge_protocol::{decode_temperature, Command, ReplyError, MESSAGE_SIZE};

/// Sends one raw buffer to a daemon and closes the connection.
///
/// Fails with [`ClientError::Connect`] when nothing is listening and with
/// [`ClientError::Send`] when the write is refused after connecting.
pub async fn send_message(addr: SocketAddr, payload: &[u8]) -> Result<(), ClientError> {
    let mut stream = connect(addr).await?;
    stream.write_all(payload).await.map_err(ClientError::Send)?;
    debug!(addr = %addr, bytes = payload.len(), "Sent message");
    Ok(())
}

async fn connect(addr: SocketAddr) -> Result<TcpStream, ClientError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect { addr, source })
}

/// Client for one fridge daemon.
#[derive(Debug, Clone)]
pub struct FridgeClient {
    addr: SocketAddr,
    message_size: usize,
}

impl FridgeClient {
    /// Creates a client reading replies of at most `message_size` bytes.
    pub fn new(addr: SocketAddr, message_size: usize) -> Self {
        Self { addr, message_size }
    }

    /// Creates a client using the default message size.
    pub fn with_defaults(addr: SocketAddr) -> Self {
        Self::new(addr, MESSAGE_SIZE)
    }

    /// Asks the daemon to leave its loop.
    pub async fn stop(&self) -> Result<(), ClientError> {
        send_message(self.addr, &Command::Stop.encode()).await
    }

    /// Pushes a new target temperature.
    pub async fn set_target(&self, temp: f32) -> Result<(), ClientError> {
        send_message(self.addr, &Command::SetTargetTemp(temp).encode()).await
    }

    /// Reads the daemon's current temperature.
    pub async fn current_temp(&self) -> Result<f32, ClientError> {
        self.query(Command::GetCurrentTemp).await
    }

    /// Reads the daemon's target temperature.
    pub async fn target_temp(&self) -> Result<f32, ClientError> {
        self.query(Command::GetTargetTemp).await
    }

    async fn query(&self, command: Command) -> Result<f32, ClientError> {
        let mut stream = connect(self.addr).await?;
        stream
            .write_all(&command.encode())
            .await
            .map_err(ClientError::Send)?;

        let mut buf = vec![0u8; self.message_size];
        let n = stream.read(&mut buf).await.map_err(ClientError::Recv)?;
        buf.truncate(n);

        let temp = decode_temperature(&buf)?;
        debug!(addr = %self.addr, ?command, temp, "Query answered");
        Ok(temp)
    }
}

/// Errors talking to a daemon.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send request: {0}")]
    Send(#[source] std::io::Error),

    #[error("Failed to receive reply: {0}")]
    Recv(#[source] std::io::Error),

    #[error("Malformed reply: {0}")]
    Reply(#[from] ReplyError),
}

impl ClientError {
    /// True when the daemon was not reachable at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, ClientError::Connect { .. })
    }
}
