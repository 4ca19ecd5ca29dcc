//! Peltier relay on a sysfs GPIO line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use fridge_core::Actuator;

/// One output line under `/sys/class/gpio`.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    line: u32,
    value_path: PathBuf,
}

impl SysfsGpio {
    /// Exports `line` if needed and configures it as an output.
    ///
    /// Writing `out` to the direction file leaves the line low.
    pub fn open(gpio_dir: impl AsRef<Path>, line: u32) -> io::Result<Self> {
        let gpio_dir = gpio_dir.as_ref();
        let line_dir = gpio_dir.join(format!("gpio{line}"));

        if !line_dir.exists() {
            debug!(line, "Exporting GPIO line");
            fs::write(gpio_dir.join("export"), line.to_string())?;
        }
        fs::write(line_dir.join("direction"), "out")?;

        Ok(Self {
            line,
            value_path: line_dir.join("value"),
        })
    }

    /// The kernel line number.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Actuator for SysfsGpio {
    fn set(&mut self, on: bool) {
        let value = if on { "1" } else { "0" };
        match fs::write(&self.value_path, value) {
            Ok(()) => debug!(line = self.line, on, "GPIO line written"),
            Err(e) => error!(line = self.line, on, error = %e, "Failed to write GPIO line"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_exported_line() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("gpio10")).unwrap();

        let mut gpio = SysfsGpio::open(dir.path(), 10).unwrap();
        assert_eq!(gpio.line(), 10);
        assert_eq!(fs::read_to_string(dir.path().join("gpio10/direction")).unwrap(), "out");

        gpio.set(true);
        assert_eq!(fs::read_to_string(dir.path().join("gpio10/value")).unwrap(), "1");
        gpio.set(false);
        assert_eq!(fs::read_to_string(dir.path().join("gpio10/value")).unwrap(), "0");
    }

    #[test]
    fn test_open_unexported_line_requests_export() {
        let dir = tempfile::tempdir().unwrap();

        // No kernel behind the tempdir, so the line directory never appears.
        assert!(SysfsGpio::open(dir.path(), 17).is_err());
        assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "17");
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("gpio5")).unwrap();
        let mut gpio = SysfsGpio::open(dir.path(), 5).unwrap();

        fs::remove_dir_all(dir.path().join("gpio5")).unwrap();
        gpio.set(true);
    }
}
