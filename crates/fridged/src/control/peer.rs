//! Simulated-mode plant: a peer daemon reached over the control protocol.
//!
//! Each tick makes up to three independent requests to the peer, each on
//! its own connection. A failed step is logged and skipped; it never aborts
//! the tick, and values from steps that succeeded are still applied.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use fridge_core::ControlState;

use crate::client::{ClientError, FridgeClient};
use crate::config::DaemonConfig;

/// One of the requests a simulated tick makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStep {
    /// Fetch the peer's current temperature
    CurrentTemp,
    /// Fetch the peer's target temperature
    TargetTemp,
    /// Push our target temperature to the peer
    PushTarget,
}

/// Outcome of one simulated tick, step by step.
#[derive(Debug)]
pub struct PeerSync {
    pub current_temp: Result<f32, ClientError>,
    pub peer_target: Result<f32, ClientError>,
    /// `None` when no push was needed or the peer target was unknown
    pub push: Option<Result<(), ClientError>>,
}

impl PeerSync {
    /// Steps that failed, in order.
    pub fn failed_steps(&self) -> Vec<PeerStep> {
        let mut failed = Vec::new();
        if self.current_temp.is_err() {
            failed.push(PeerStep::CurrentTemp);
        }
        if self.peer_target.is_err() {
            failed.push(PeerStep::TargetTemp);
        }
        if matches!(self.push, Some(Err(_))) {
            failed.push(PeerStep::PushTarget);
        }
        failed
    }
}

/// Connection details for the peer daemon.
#[derive(Debug, Clone)]
pub struct PeerLink {
    client: FridgeClient,
    sim_delay: Duration,
}

impl PeerLink {
    pub fn new(addr: SocketAddr, message_size: usize, sim_delay: Duration) -> Self {
        Self {
            client: FridgeClient::new(addr, message_size),
            sim_delay,
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            config.simulation.peer_address,
            config.server.message_size,
            config.sim_delay(),
        )
    }

    /// Mirrors the peer's temperature and pushes our target if it differs.
    pub async fn sync(&self, state: &mut ControlState) -> PeerSync {
        let current_temp = self.client.current_temp().await;
        match &current_temp {
            Ok(temp) => state.record_reading(*temp),
            Err(e) => log_failure(PeerStep::CurrentTemp, e),
        }

        let peer_target = self.client.target_temp().await;
        if let Err(e) = &peer_target {
            log_failure(PeerStep::TargetTemp, e);
        }

        let push = match &peer_target {
            Ok(theirs) if *theirs != state.target_temp() => {
                debug!(ours = state.target_temp(), theirs, "Pushing target to peer");
                let result = self.client.set_target(state.target_temp()).await;
                if let Err(e) = &result {
                    log_failure(PeerStep::PushTarget, e);
                }
                Some(result)
            }
            _ => None,
        };

        PeerSync {
            current_temp,
            peer_target,
            push,
        }
    }

    /// Sleeps for the configured sensor latency.
    pub async fn simulate_latency(&self) {
        if !self.sim_delay.is_zero() {
            sleep(self.sim_delay).await;
        }
    }
}

fn log_failure(step: PeerStep, error: &ClientError) {
    match step {
        PeerStep::CurrentTemp => {
            warn!(peer_step = ?step, error = %error, "Peer current-temperature query failed")
        }
        PeerStep::TargetTemp => {
            warn!(peer_step = ?step, error = %error, "Peer target-temperature query failed")
        }
        PeerStep::PushTarget => {
            warn!(peer_step = ?step, error = %error, "Pushing target to peer failed")
        }
    }
}
