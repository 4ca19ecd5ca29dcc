//! A single accepted client connection.
//!
//! Connections carry exactly one request: the server reads once, applies
//! the command, optionally replies, and drops the connection.

use std::io;
use std::net::SocketAddr;
use std::task::Context;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use fridge_protocol::{encode_temperature, Command};

/// An accepted client waiting to send its request.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    peer: SocketAddr,
    stream: TcpStream,
}

impl Connection {
    pub fn new(id: u64, stream: TcpStream, peer: SocketAddr) -> Self {
        Self { id, peer, stream }
    }

    /// Connection number, for logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Polls for read readiness.
    ///
    /// A readiness error counts as readable so the following read surfaces
    /// it.
    pub fn poll_readable(&self, cx: &mut Context<'_>) -> bool {
        self.stream.poll_read_ready(cx).is_ready()
    }

    /// Reads one request of at most `message_size` bytes and decodes it.
    pub async fn read_command(&mut self, message_size: usize) -> Result<Command, ConnectionError> {
        let mut buf = vec![0u8; message_size];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(ConnectionError::Eof);
        }
        buf.truncate(n);

        let command = Command::decode(&buf);
        if let Command::SetTargetTemp(temp) = command {
            if !Command::is_well_formed_setpoint(&buf) {
                warn!(
                    connection = self.id,
                    bytes = n,
                    fallback = temp,
                    "Undecodable setpoint, substituting fallback"
                );
            }
        }

        debug!(connection = self.id, ?command, "Received request");
        Ok(command)
    }

    /// Writes a 4-byte temperature reply.
    pub async fn reply(&mut self, temp: f32) -> Result<(), ConnectionError> {
        self.stream.write_all(&encode_temperature(temp)).await?;
        debug!(connection = self.id, temp, "Sent reply");
        Ok(())
    }
}

/// Errors that can occur while serving a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed before a request arrived")]
    Eof,
}
