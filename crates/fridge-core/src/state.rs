//! The process-wide control state record.
//!
//! One `ControlState` exists per daemon instance. It is owned by the event
//! loop and only ever touched from that loop, so it carries no locking.
//!
//! Field ownership:
//! - `current_temp` is written only by the control tick
//! - `target_temp` is written by the protocol handler (and at startup)
//! - `actuator_on` is written only by the control tick, in lockstep with
//!   the actuator command it issues
//! - `running` is cleared exactly once, by a stop request

use tracing::debug;

/// Mutable state shared between the protocol handler and the control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    current_temp: f32,
    target_temp: f32,
    actuator_on: bool,
    running: bool,
}

impl ControlState {
    /// Creates the startup state with the given setpoint.
    ///
    /// The current temperature reads `0.0` until the first sample lands.
    pub fn new(target_temp: f32) -> Self {
        Self {
            current_temp: 0.0,
            target_temp,
            actuator_on: false,
            running: true,
        }
    }

    /// Last sampled temperature.
    pub fn current_temp(&self) -> f32 {
        self.current_temp
    }

    /// Desired setpoint.
    pub fn target_temp(&self) -> f32 {
        self.target_temp
    }

    /// Last commanded actuator level.
    pub fn actuator_on(&self) -> bool {
        self.actuator_on
    }

    /// Whether the event loop should keep going.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Records a fresh temperature sample.
    pub fn record_reading(&mut self, temp: f32) {
        self.current_temp = temp;
    }

    /// Replaces the setpoint.
    pub fn set_target(&mut self, temp: f32) {
        if temp != self.target_temp {
            debug!(from = self.target_temp, to = temp, "Target temperature changed");
        }
        self.target_temp = temp;
    }

    /// Records the level just commanded on the actuator.
    pub fn record_actuator(&mut self, on: bool) {
        self.actuator_on = on;
    }

    /// Requests the event loop to exit after the current iteration.
    pub fn stop(&mut self) {
        self.running = false;
    }
}
