//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors reported by a temperature source.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The device file could not be read
    #[error("Failed to read sensor {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// The device reported a failed CRC check
    #[error("Sensor {device} reported a CRC failure")]
    Crc { device: String },

    /// The device output did not contain a temperature
    #[error("Malformed reading from {device}: {reason}")]
    Malformed { device: String, reason: String },

    /// The sensor is not available (simulated or detached)
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),
}
