//! Fridge Core - Shared types for the peltier controller
//!
//! This crate provides the control-state record, the hysteresis policy,
//! and the capability traits the daemon consumes for sensing and actuation.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod hysteresis;
pub mod plant;
pub mod state;

// Re-exports for convenience
pub use error::SensorError;
pub use hysteresis::{decide, Switch};
pub use plant::{Actuator, NoopActuator, TemperatureSource};
pub use state::ControlState;
