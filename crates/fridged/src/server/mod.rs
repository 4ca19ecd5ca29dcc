//! TCP control server and event loop for the fridge daemon.
//!
//! The server:
//! - Listens on a TCP port for one-shot client connections
//! - Multiplexes readiness of the listener and every open connection
//!   behind one bounded wait
//! - Serves each readable connection's single request, then closes it
//! - Runs one control tick after every wait, including pure timeouts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 DaemonServer                 │
//! │                                              │
//! │   TcpListener + Vec<Connection>              │
//! │        │  wait (timeout = daemon delay)      │
//! │        ▼                                     │
//! │   accept / read one request / reply / close  │
//! │        │                                     │
//! │        ▼                                     │
//! │   ControlState ◀──── Controller::tick        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one task: connections are served one after another
//! within an iteration, and the control state needs no locking.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Per-connection failures are logged and never end the loop

mod connection;

pub use connection::{Connection, ConnectionError};

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use fridge_core::ControlState;
use fridge_protocol::Command;

use crate::config::{DaemonConfig, ServerConfig};
use crate::control::Controller;

/// Binds and listens on the configured address.
///
/// Must be called from within a tokio runtime.
pub fn bind_listener(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::new(config.bind_address, config.port);
    let bind_err = |source| ServerError::Bind { addr, source };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_err)?;
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(config.listen_backlog).map_err(bind_err)
}

/// What one readiness wait returned.
struct Ready {
    accepted: Option<io::Result<(TcpStream, SocketAddr)>>,
    readable: Vec<usize>,
}

/// The fridge daemon's event loop.
pub struct DaemonServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    message_size: usize,
    daemon_delay: Duration,
    state: ControlState,
    controller: Controller,
    connections: Vec<Connection>,
    connection_counter: u64,
}

impl DaemonServer {
    /// Wraps an already listening socket.
    pub fn new(
        listener: TcpListener,
        config: &DaemonConfig,
        controller: Controller,
    ) -> Result<Self, ServerError> {
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: config.listen_addr(),
            source,
        })?;

        Ok(Self {
            listener,
            local_addr,
            message_size: config.server.message_size,
            daemon_delay: config.daemon_delay(),
            state: ControlState::new(config.server.initial_target_temp),
            controller,
            connections: Vec::new(),
            connection_counter: 0,
        })
    }

    /// Binds the configured address and creates the server.
    pub fn bind(config: &DaemonConfig, controller: Controller) -> Result<Self, ServerError> {
        let listener = bind_listener(&config.server)?;
        Self::new(listener, config, controller)
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current control state.
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Runs the loop until a stop request arrives.
    ///
    /// On return the listening socket is closed and, for hardware-backed
    /// controllers, the actuator has been forced off. Returns the final
    /// control state.
    pub async fn run(mut self) -> ControlState {
        info!(
            addr = %self.local_addr,
            mode = ?self.controller.mode(),
            target = self.state.target_temp(),
            "Daemon server listening"
        );
        self.controller.engage();

        while self.state.is_running() {
            let ready = wait_ready(&self.listener, &self.connections, self.daemon_delay).await;

            if let Some(ready) = ready {
                if let Some(accepted) = ready.accepted {
                    self.accept(accepted);
                }
                self.serve_readable(&ready.readable).await;
            }

            self.controller.tick(&mut self.state).await;
        }

        self.shutdown()
    }

    fn accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) {
        match accepted {
            Ok((stream, peer)) => {
                self.connection_counter += 1;
                debug!(connection = self.connection_counter, peer = %peer, "Connection accepted");
                self.connections
                    .push(Connection::new(self.connection_counter, stream, peer));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }

    async fn serve_readable(&mut self, readable: &[usize]) {
        if readable.is_empty() {
            return;
        }

        let open = std::mem::take(&mut self.connections);
        for (index, conn) in open.into_iter().enumerate() {
            if readable.binary_search(&index).is_ok() {
                self.serve(conn).await;
            } else {
                self.connections.push(conn);
            }
        }
    }

    /// Serves one request and drops the connection.
    async fn serve(&mut self, mut conn: Connection) {
        let command = match conn.read_command(self.message_size).await {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    connection = conn.id(),
                    peer = %conn.peer(),
                    error = %e,
                    "Failed to read request, treating as unreadable setpoint"
                );
                Command::unreadable()
            }
        };

        if let Err(e) = self.apply(command, &mut conn).await {
            warn!(connection = conn.id(), error = %e, "Failed to send reply");
        }
        debug!(connection = conn.id(), "Connection closed");
    }

    async fn apply(
        &mut self,
        command: Command,
        conn: &mut Connection,
    ) -> Result<(), ConnectionError> {
        match command {
            Command::Stop => {
                info!(connection = conn.id(), "Stop requested, shutting down");
                self.state.stop();
            }
            Command::GetCurrentTemp => conn.reply(self.state.current_temp()).await?,
            Command::GetTargetTemp => conn.reply(self.state.target_temp()).await?,
            Command::SetTargetTemp(temp) => {
                info!(connection = conn.id(), target = temp, "Setting new target temperature");
                self.state.set_target(temp);
            }
        }
        Ok(())
    }

    fn shutdown(self) -> ControlState {
        let Self {
            listener,
            mut state,
            mut controller,
            connections,
            ..
        } = self;

        info!(pending = connections.len(), "Closing socket");
        drop(connections);
        drop(listener);

        controller.release(&mut state);
        info!("Daemon server stopped");
        state
    }
}

/// Waits until the listener or any open connection is ready, or the delay
/// elapses. Returns `None` on timeout.
async fn wait_ready(
    listener: &TcpListener,
    connections: &[Connection],
    delay: Duration,
) -> Option<Ready> {
    timeout(delay, poll_fn(|cx| poll_ready(listener, connections, cx)))
        .await
        .ok()
}

fn poll_ready(
    listener: &TcpListener,
    connections: &[Connection],
    cx: &mut Context<'_>,
) -> Poll<Ready> {
    let accepted = match listener.poll_accept(cx) {
        Poll::Ready(result) => Some(result),
        Poll::Pending => None,
    };

    let readable: Vec<usize> = connections
        .iter()
        .enumerate()
        .filter(|(_, conn)| conn.poll_readable(cx))
        .map(|(index, _)| index)
        .collect();

    if accepted.is_none() && readable.is_empty() {
        Poll::Pending
    } else {
        Poll::Ready(Ready { accepted, readable })
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::NoSensor;
    use fridge_core::NoopActuator;

    fn loopback_config() -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.server.bind_address = "127.0.0.1".parse().unwrap();
        config.server.port = 0;
        config.server.daemon_delay_ms = 20;
        config
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:10000".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert!(err.to_string().contains("127.0.0.1:10000"));
        assert!(err.to_string().contains("address in use"));
    }

    #[tokio::test]
    async fn test_bind_uses_initial_target() {
        let mut config = loopback_config();
        config.server.initial_target_temp = 7.5;

        let server =
            DaemonServer::bind(&config, Controller::direct(NoSensor, NoopActuator)).unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.state().target_temp(), 7.5);
        assert_eq!(server.state().current_temp(), 0.0);
    }

    #[tokio::test]
    async fn test_bind_conflict_fails() {
        let config = loopback_config();
        let first =
            DaemonServer::bind(&config, Controller::direct(NoSensor, NoopActuator)).unwrap();

        let mut taken = config.clone();
        taken.server.port = first.local_addr().port();
        let err = DaemonServer::bind(&taken, Controller::direct(NoSensor, NoopActuator))
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
