//! DS18B20 sensor on the kernel 1-Wire bus.
//!
//! The kernel exposes each probe as `<devices>/28-<id>/w1_slave`:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line ends in `YES` when the CRC matched; the second carries the
//! temperature in millidegrees Celsius.

use std::fs;
use std::path::{Path, PathBuf};

use fridge_core::{SensorError, TemperatureSource};

/// 1-Wire family code of the DS18B20.
pub const DS18B20_FAMILY: &str = "28";

/// A DS18B20 probe read through sysfs.
#[derive(Debug, Clone)]
pub struct W1Sensor {
    device: String,
    path: PathBuf,
}

impl W1Sensor {
    /// Locates the probe `sensor_id` (without family prefix) under `devices_dir`.
    pub fn new(devices_dir: impl AsRef<Path>, sensor_id: &str) -> Self {
        let device = format!("{DS18B20_FAMILY}-{sensor_id}");
        let path = devices_dir.as_ref().join(&device).join("w1_slave");
        Self { device, path }
    }

    /// Path of the `w1_slave` file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSource for W1Sensor {
    fn read(&mut self) -> Result<f32, SensorError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SensorError::Io {
            device: self.device.clone(),
            source,
        })?;
        parse_w1_slave(&self.device, &contents)
    }
}

/// Parses the contents of a `w1_slave` file into degrees Celsius.
pub fn parse_w1_slave(device: &str, contents: &str) -> Result<f32, SensorError> {
    let mut lines = contents.lines();

    let status = lines.next().unwrap_or_default();
    if !status.trim_end().ends_with("YES") {
        return Err(SensorError::Crc {
            device: device.to_string(),
        });
    }

    let data = lines.next().unwrap_or_default();
    let (_, raw) = data.rsplit_once("t=").ok_or_else(|| SensorError::Malformed {
        device: device.to_string(),
        reason: "missing t= field".to_string(),
    })?;

    let millidegrees: i32 = raw.trim().parse().map_err(|e| SensorError::Malformed {
        device: device.to_string(),
        reason: format!("bad temperature {raw:?}: {e}"),
    })?;

    Ok(millidegrees as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n\
                        72 01 4b 46 7f ff 0e 10 57 t=23125\n";

    #[test]
    fn test_parse_good_reading() {
        assert_eq!(parse_w1_slave("28-x", GOOD).unwrap(), 23.125);
    }

    #[test]
    fn test_parse_negative_reading() {
        let contents = "ff ff : crc=ab YES\nff ff t=-1500\n";
        assert_eq!(parse_w1_slave("28-x", contents).unwrap(), -1.5);
    }

    #[test]
    fn test_parse_crc_failure() {
        let contents = "72 01 : crc=57 NO\n72 01 t=23125\n";
        assert!(matches!(
            parse_w1_slave("28-x", contents),
            Err(SensorError::Crc { .. })
        ));
    }

    #[test]
    fn test_parse_missing_temperature() {
        let contents = "72 01 : crc=57 YES\n72 01\n";
        let err = parse_w1_slave("28-x", contents).unwrap_err();
        assert!(err.to_string().contains("t="));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_w1_slave("28-x", "").is_err());
    }

    #[test]
    fn test_read_from_sysfs_tree() {
        let dir = tempfile::tempdir().unwrap();
        let device_dir = dir.path().join("28-000006cae9dd");
        fs::create_dir_all(&device_dir).unwrap();
        fs::write(device_dir.join("w1_slave"), GOOD).unwrap();

        let mut sensor = W1Sensor::new(dir.path(), "000006cae9dd");
        assert_eq!(sensor.read().unwrap(), 23.125);
    }

    #[test]
    fn test_read_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut sensor = W1Sensor::new(dir.path(), "deadbeef");
        assert!(sensor.path().ends_with("28-deadbeef/w1_slave"));
        assert!(matches!(sensor.read(), Err(SensorError::Io { .. })));
    }
}
