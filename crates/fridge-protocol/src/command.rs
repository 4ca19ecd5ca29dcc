//! Request decoding.
//!
//! Decoding is total: every buffer maps to exactly one [`Command`]. Buffers
//! that are not one of the three keywords are set-target requests, and a
//! set-target buffer that does not hold a float yields
//! [`UNDECODABLE_SETPOINT`].

use crate::temperature::{decode_temperature, encode_temperature};
use crate::{GET_CURRENT_TEMP, GET_TARGET_TEMP, STOP};

/// Setpoint applied when a set-target buffer cannot be decoded.
///
/// This also covers failed reads (peer reset, empty read), so a dropped
/// connection zeroes the setpoint.
pub const UNDECODABLE_SETPOINT: f32 = 0.0;

/// A decoded client request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Stop the daemon loop
    Stop,
    /// Reply with the current temperature
    GetCurrentTemp,
    /// Reply with the target temperature
    GetTargetTemp,
    /// Replace the target temperature
    SetTargetTemp(f32),
}

impl Command {
    /// Decodes one request buffer.
    pub fn decode(buf: &[u8]) -> Self {
        match std::str::from_utf8(buf) {
            Ok(STOP) => Command::Stop,
            Ok(GET_CURRENT_TEMP) => Command::GetCurrentTemp,
            Ok(GET_TARGET_TEMP) => Command::GetTargetTemp,
            _ => Command::SetTargetTemp(Self::setpoint(buf)),
        }
    }

    /// The command applied when reading the request itself failed.
    pub fn unreadable() -> Self {
        Command::SetTargetTemp(UNDECODABLE_SETPOINT)
    }

    /// Decodes a set-target payload, substituting [`UNDECODABLE_SETPOINT`].
    pub fn setpoint(buf: &[u8]) -> f32 {
        decode_temperature(buf).unwrap_or(UNDECODABLE_SETPOINT)
    }

    /// Returns true when `buf` decodes to a float without the fallback.
    pub fn is_well_formed_setpoint(buf: &[u8]) -> bool {
        decode_temperature(buf).is_ok()
    }

    /// Encodes the request as sent by a client.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Stop => STOP.as_bytes().to_vec(),
            Command::GetCurrentTemp => GET_CURRENT_TEMP.as_bytes().to_vec(),
            Command::GetTargetTemp => GET_TARGET_TEMP.as_bytes().to_vec(),
            Command::SetTargetTemp(temp) => encode_temperature(*temp).to_vec(),
        }
    }
}
