//! Hardware adapters for direct mode.
//!
//! - `w1` - DS18B20 1-Wire temperature sensor via the kernel w1 driver
//! - `gpio` - peltier relay on a sysfs GPIO line

mod gpio;
mod w1;

pub use gpio::SysfsGpio;
pub use w1::{parse_w1_slave, W1Sensor, DS18B20_FAMILY};
