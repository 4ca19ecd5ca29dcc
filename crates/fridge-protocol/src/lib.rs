//! Fridge Protocol - Wire protocol for daemon communication
//!
//! One request per TCP connection. A request is a single buffer of at
//! most [`MESSAGE_SIZE`] bytes; replies to temperature queries are exactly
//! [`TEMP_WIRE_SIZE`] bytes.
//!
//! | Request           | Reply                          |
//! |-------------------|--------------------------------|
//! | `"stop"`          | none, the daemon exits its loop |
//! | `"gct"`           | current temperature (f32)      |
//! | `"gtt"`           | target temperature (f32)       |
//! | any other buffer  | none, parsed as a new target   |

pub mod command;
pub mod temperature;

pub use command::{Command, UNDECODABLE_SETPOINT};
pub use temperature::{decode_temperature, encode_temperature, ReplyError, TEMP_WIRE_SIZE};

/// Default upper bound on the size of one request buffer.
pub const MESSAGE_SIZE: usize = 16;

/// Keyword requesting the daemon to stop.
pub const STOP: &str = "stop";

/// Keyword requesting the current temperature.
pub const GET_CURRENT_TEMP: &str = "gct";

/// Keyword requesting the target temperature.
pub const GET_TARGET_TEMP: &str = "gtt";
