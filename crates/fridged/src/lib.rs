//! Fridge Daemon - Peltier controller with a TCP control protocol
//!
//! This crate provides the daemon's moving parts:
//! - `server` - Event loop multiplexing the control socket and the control tick
//! - `control` - Control tick against local hardware or a simulated peer
//! - `client` - One-shot protocol clients (stop/restart signaling, queries)
//! - `hardware` - 1-Wire sensor and sysfs GPIO adapters
//! - `config` - Immutable daemon configuration
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        fridged                            │
//! ├───────────────────────────────────────────────────────────┤
//! │                                                           │
//! │  client ──TCP──▶ DaemonServer ──decode──▶ Command         │
//! │                      │                                    │
//! │                      │ owns                               │
//! │                      ▼                                    │
//! │                 ControlState ◀──── Controller::tick        │
//! │                                        │                  │
//! │                          ┌─────────────┴────────────┐     │
//! │                          ▼                          ▼     │
//! │                W1Sensor + SysfsGpio        PeerLink (TCP) │
//! │                                                           │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`

pub mod client;
pub mod config;
pub mod control;
pub mod hardware;
pub mod server;
