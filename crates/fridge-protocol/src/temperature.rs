//! Float encoding shared by replies and set-target requests.
//!
//! Temperatures travel as 4-byte IEEE-754 floats in native byte order, on
//! both ends of the connection.

use thiserror::Error;

/// Size of an encoded temperature.
pub const TEMP_WIRE_SIZE: usize = 4;

/// Errors decoding a temperature buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("Expected {expected} bytes for a temperature, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Encodes a temperature for the wire.
pub fn encode_temperature(temp: f32) -> [u8; TEMP_WIRE_SIZE] {
    temp.to_ne_bytes()
}

/// Decodes a temperature; the buffer must be exactly [`TEMP_WIRE_SIZE`] long.
pub fn decode_temperature(bytes: &[u8]) -> Result<f32, ReplyError> {
    let raw: [u8; TEMP_WIRE_SIZE] = bytes.try_into().map_err(|_| ReplyError::Length {
        expected: TEMP_WIRE_SIZE,
        actual: bytes.len(),
    })?;
    Ok(f32::from_ne_bytes(raw))
}
