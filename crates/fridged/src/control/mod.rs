//! The control tick.
//!
//! A [`Controller`] is built once per process around one of two plants:
//!
//! - **Direct**: a local [`TemperatureSource`] and [`Actuator`], driven by
//!   the bang-bang policy in [`fridge_core::hysteresis`]
//! - **Simulated**: a [`PeerLink`] to another daemon speaking the same
//!   protocol, which stands in for the hardware
//!
//! The event loop calls [`Controller::tick`] once per iteration and never
//! needs to know which plant it is driving.
//!
//! # Safety shutdown
//!
//! Once engaged, a hardware-backed controller forces the actuator off
//! exactly once when released, or when dropped if release never ran.

mod peer;

pub use peer::{PeerLink, PeerStep, PeerSync};

use std::io;

use tracing::{debug, info, warn};

use fridge_core::{decide, Actuator, ControlState, TemperatureSource};

use crate::config::DaemonConfig;
use crate::hardware::{SysfsGpio, W1Sensor};

/// Operating mode, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Direct,
    Simulated,
}

/// A local sensor and actuator pair.
pub struct DirectPlant {
    sensor: Box<dyn TemperatureSource>,
    actuator: Box<dyn Actuator>,
}

/// What the controller drives.
pub enum Plant {
    Direct(DirectPlant),
    Simulated(PeerLink),
}

/// Runs control ticks against a plant.
pub struct Controller {
    plant: Plant,
    engaged: bool,
}

impl Controller {
    /// Creates a direct-mode controller.
    pub fn direct(
        sensor: impl TemperatureSource + 'static,
        actuator: impl Actuator + 'static,
    ) -> Self {
        Self {
            plant: Plant::Direct(DirectPlant {
                sensor: Box::new(sensor),
                actuator: Box::new(actuator),
            }),
            engaged: false,
        }
    }

    /// Creates a simulated-mode controller.
    pub fn simulated(link: PeerLink) -> Self {
        Self {
            plant: Plant::Simulated(link),
            engaged: false,
        }
    }

    /// Builds the controller for `mode` from configuration.
    ///
    /// Direct mode opens the GPIO line here, so this touches hardware.
    pub fn from_config(config: &DaemonConfig, mode: Mode) -> io::Result<Self> {
        match mode {
            Mode::Direct => {
                let hw = &config.hardware;
                let sensor = W1Sensor::new(&hw.w1_devices_dir, &hw.sensor_id);
                let gpio = SysfsGpio::open(&hw.gpio_dir, hw.gpio_line)?;
                info!(
                    sensor = %sensor.path().display(),
                    gpio_line = gpio.line(),
                    "Direct mode"
                );
                Ok(Self::direct(sensor, gpio))
            }
            Mode::Simulated => {
                info!(peer = %config.simulation.peer_address, "Simulated mode");
                Ok(Self::simulated(PeerLink::from_config(config)))
            }
        }
    }

    /// The mode this controller was built for.
    pub fn mode(&self) -> Mode {
        match self.plant {
            Plant::Direct(_) => Mode::Direct,
            Plant::Simulated(_) => Mode::Simulated,
        }
    }

    /// Arms the safety shutdown. Called when the event loop starts.
    pub fn engage(&mut self) {
        self.engaged = true;
    }

    /// Runs one sense-compare-actuate cycle.
    pub async fn tick(&mut self, state: &mut ControlState) {
        match &mut self.plant {
            Plant::Direct(plant) => plant.tick(state),
            Plant::Simulated(link) => {
                link.sync(state).await;
                link.simulate_latency().await;
            }
        }
    }

    /// Forces the actuator off if engaged and hardware-backed.
    ///
    /// Disarms the controller, so repeated calls and the later drop do
    /// nothing.
    pub fn release(&mut self, state: &mut ControlState) {
        if self.force_off() {
            state.record_actuator(false);
        }
    }

    fn force_off(&mut self) -> bool {
        if !std::mem::replace(&mut self.engaged, false) {
            return false;
        }
        match &mut self.plant {
            Plant::Direct(plant) => {
                info!("Turning off actuator");
                plant.actuator.set(false);
                true
            }
            Plant::Simulated(_) => false,
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.force_off() {
            warn!("Actuator forced off on drop");
        }
    }
}

impl DirectPlant {
    fn tick(&mut self, state: &mut ControlState) {
        match self.sensor.read() {
            Ok(temp) => state.record_reading(temp),
            Err(e) => {
                warn!(
                    error = %e,
                    last = state.current_temp(),
                    "Sensor read failed, keeping last reading"
                );
                return;
            }
        }

        let switch = decide(state.current_temp(), state.target_temp(), state.actuator_on());
        if let Some(on) = switch.level() {
            info!(
                on,
                current = state.current_temp(),
                target = state.target_temp(),
                "Switching cooler"
            );
            self.actuator.set(on);
            state.record_actuator(on);
        } else {
            debug!(current = state.current_temp(), target = state.target_temp(), "Holding");
        }
    }
}

/// Sensor that is never available.
///
/// Useful for running the loop without hardware: the current temperature
/// stays at its startup value and the actuator is never switched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl TemperatureSource for NoSensor {
    fn read(&mut self) -> Result<f32, fridge_core::SensorError> {
        Err(fridge_core::SensorError::Unavailable("no sensor attached".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use fridge_core::{NoopActuator, SensorError};

    struct FixedSensor(f32);

    impl TemperatureSource for FixedSensor {
        fn read(&mut self) -> Result<f32, SensorError> {
            Ok(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingActuator(Arc<Mutex<Vec<bool>>>);

    impl RecordingActuator {
        fn commands(&self) -> Vec<bool> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Actuator for RecordingActuator {
        fn set(&mut self, on: bool) {
            self.0.lock().unwrap().push(on);
        }
    }

    fn state(target: f32, actuator_on: bool) -> ControlState {
        let mut state = ControlState::new(target);
        state.record_actuator(actuator_on);
        state
    }

    #[tokio::test]
    async fn test_cold_and_off_stays_off() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(FixedSensor(5.0), actuator.clone());
        let mut state = state(10.0, false);

        controller.tick(&mut state).await;

        assert_eq!(state.current_temp(), 5.0);
        assert!(!state.actuator_on());
        assert!(actuator.commands().is_empty());
    }

    #[tokio::test]
    async fn test_warm_and_off_turns_on() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(FixedSensor(15.0), actuator.clone());
        let mut state = state(10.0, false);

        controller.tick(&mut state).await;

        assert!(state.actuator_on());
        assert_eq!(actuator.commands(), vec![true]);
    }

    #[tokio::test]
    async fn test_cold_and_on_turns_off() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(FixedSensor(5.0), actuator.clone());
        let mut state = state(10.0, true);

        controller.tick(&mut state).await;

        assert!(!state.actuator_on());
        assert_eq!(actuator.commands(), vec![false]);
    }

    #[tokio::test]
    async fn test_failed_read_keeps_last_reading_and_actuator() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(NoSensor, actuator.clone());
        let mut state = state(10.0, false);
        state.record_reading(20.0);

        controller.tick(&mut state).await;

        assert_eq!(state.current_temp(), 20.0);
        assert!(!state.actuator_on());
        assert!(actuator.commands().is_empty());
    }

    #[test]
    fn test_release_forces_off_exactly_once() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(FixedSensor(15.0), actuator.clone());
        let mut state = state(10.0, true);

        controller.engage();
        controller.release(&mut state);
        controller.release(&mut state);
        drop(controller);

        assert!(!state.actuator_on());
        assert_eq!(actuator.commands(), vec![false]);
    }

    #[test]
    fn test_drop_forces_off_when_engaged() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(FixedSensor(15.0), actuator.clone());
        controller.engage();
        drop(controller);
        assert_eq!(actuator.commands(), vec![false]);
    }

    #[test]
    fn test_unengaged_controller_leaves_actuator_alone() {
        let actuator = RecordingActuator::default();
        let mut controller = Controller::direct(FixedSensor(15.0), actuator.clone());
        let mut state = state(10.0, false);
        controller.release(&mut state);
        drop(controller);
        assert!(actuator.commands().is_empty());
    }

    #[test]
    fn test_mode_reporting() {
        let controller = Controller::direct(NoSensor, NoopActuator);
        assert_eq!(controller.mode(), Mode::Direct);

        let addr = "127.0.0.1:1".parse().unwrap();
        let controller = Controller::simulated(PeerLink::new(addr, 16, std::time::Duration::ZERO));
        assert_eq!(controller.mode(), Mode::Simulated);
    }
}
