//! Capability traits for the controlled plant.
//!
//! The control tick only ever talks to a [`TemperatureSource`] and an
//! [`Actuator`]; real hardware and test doubles both implement them.

use crate::error::SensorError;

/// Yields the current temperature on demand.
pub trait TemperatureSource: Send {
    /// Reads the temperature in degrees Celsius.
    fn read(&mut self) -> Result<f32, SensorError>;
}

/// Accepts on/off commands for the cooler.
///
/// Commands are fire-and-forget: implementations log their own failures
/// and never report them to the caller.
pub trait Actuator: Send {
    /// Drives the output high (`true`) or low (`false`).
    fn set(&mut self, on: bool);
}

/// Actuator that accepts every command and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActuator;

impl Actuator for NoopActuator {
    fn set(&mut self, _on: bool) {}
}

impl<T: TemperatureSource + ?Sized> TemperatureSource for Box<T> {
    fn read(&mut self) -> Result<f32, SensorError> {
        (**self).read()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set(&mut self, on: bool) {
        (**self).set(on)
    }
}
