//! Daemon configuration.
//!
//! A `DaemonConfig` is built once at startup (defaults, then an optional
//! TOML file, then command-line overrides) and handed to the server and
//! controller constructors. Nothing in the daemon reads configuration from
//! ambient process state.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 10000
//! message_size = 16
//! initial_target_temp = 4.0
//! daemon_delay_ms = 250
//!
//! [simulation]
//! peer_address = "127.0.0.1:10001"
//! sim_delay_ms = 400
//!
//! [hardware]
//! sensor_id = "000006cae9dd"
//! gpio_line = 10
//! ```

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use fridge_protocol::{MESSAGE_SIZE, TEMP_WIRE_SIZE};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "fridge.toml";

/// Largest per-connection read buffer accepted from configuration.
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Default control port.
pub const DEFAULT_PORT: u16 = 10000;

/// Default address of the peer daemon used in simulated mode.
pub const DEFAULT_PEER_ADDRESS: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 10001);

/// Top-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
    pub hardware: HardwareConfig,
}

/// Listening socket and event loop settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_address: IpAddr,
    /// TCP port to listen on
    pub port: u16,
    /// Upper bound on one request buffer
    pub message_size: usize,
    /// Setpoint used until a client sets one
    pub initial_target_temp: f32,
    /// Readiness-wait timeout, which is also the control tick period
    pub daemon_delay_ms: u64,
    /// Listen backlog passed to the OS
    pub listen_backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            message_size: MESSAGE_SIZE,
            initial_target_temp: 4.0,
            daemon_delay_ms: 250,
            listen_backlog: 4,
        }
    }
}

/// Peer link settings for simulated mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Address of the peer daemon standing in for the hardware
    pub peer_address: SocketAddr,
    /// Extra delay after each simulated tick, mimicking sensor latency
    pub sim_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            peer_address: DEFAULT_PEER_ADDRESS,
            sim_delay_ms: 400,
        }
    }
}

/// Sensor and GPIO settings for direct mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardwareConfig {
    /// 1-Wire sensor id, without the family prefix
    pub sensor_id: String,
    /// Where the kernel exposes 1-Wire devices
    pub w1_devices_dir: PathBuf,
    /// Kernel GPIO line driving the peltier (physical board pin 19)
    pub gpio_line: u32,
    /// Sysfs GPIO class directory
    pub gpio_dir: PathBuf,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            sensor_id: "000006cae9dd".to_string(),
            w1_devices_dir: PathBuf::from("/sys/bus/w1/devices"),
            gpio_line: 10,
            gpio_dir: PathBuf::from("/sys/class/gpio"),
        }
    }
}

impl DaemonConfig {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the loop depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.message_size < TEMP_WIRE_SIZE {
            return Err(ConfigError::Invalid {
                field: "server.message_size",
                reason: format!(
                    "{} is too small to hold a {TEMP_WIRE_SIZE}-byte temperature",
                    self.server.message_size
                ),
            });
        }
        if self.server.message_size > MAX_MESSAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "server.message_size",
                reason: format!(
                    "{} exceeds the {MAX_MESSAGE_SIZE}-byte limit",
                    self.server.message_size
                ),
            });
        }
        if self.server.daemon_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "server.daemon_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.server.initial_target_temp.is_finite() {
            return Err(ConfigError::Invalid {
                field: "server.initial_target_temp",
                reason: format!("{} is not a finite temperature", self.server.initial_target_temp),
            });
        }
        Ok(())
    }

    /// Socket address the daemon listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_address, self.server.port)
    }

    /// Address clients on this host use to reach the daemon.
    pub fn client_addr(&self) -> SocketAddr {
        let ip = if self.server.bind_address.is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.server.bind_address
        };
        SocketAddr::new(ip, self.server.port)
    }

    /// Readiness-wait timeout.
    pub fn daemon_delay(&self) -> Duration {
        Duration::from_millis(self.server.daemon_delay_ms)
    }

    /// Delay appended to each simulated tick.
    pub fn sim_delay(&self) -> Duration {
        Duration::from_millis(self.simulation.sim_delay_ms)
    }
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
