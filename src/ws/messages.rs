//! WebSocket wire contract: inbound command envelope and field coercion.
//!
//! Clients send one JSON object per frame:
//!
//! ```json
//! { "type": "cmd_vel", "linear": 0.5, "angular": -0.2 }
//! ```
//!
//! `linear` and `angular` are optional and default to `0.0`. The bridge never
//! replies.

use serde_json::{Map, Value};

use crate::domain::MotionCommand;
use crate::error::DecodeError;

/// Discriminator field name.
pub const TYPE_FIELD: &str = "type";

/// Forward velocity field name.
pub const LINEAR_FIELD: &str = "linear";

/// Yaw rate field name.
pub const ANGULAR_FIELD: &str = "angular";

/// The only message kind the bridge acts on.
pub const CMD_VEL: &str = "cmd_vel";

/// Numeric fields of a `cmd_vel` document, already coerced.
///
/// Built from a parsed JSON object rather than deserialized, because the
/// fields accept strings and booleans as well as numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandEnvelope {
    /// Forward velocity.
    pub linear: f64,
    /// Yaw rate.
    pub angular: f64,
}

impl CommandEnvelope {
    /// Extracts the numeric fields of a `cmd_vel` document.
    ///
    /// Missing fields default to `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidField`] if a present field cannot be
    /// converted to a finite number.
    pub fn from_cmd_vel_object(map: &Map<String, Value>) -> Result<Self, DecodeError> {
        Ok(Self {
            linear: number_field(map, LINEAR_FIELD)?,
            angular: number_field(map, ANGULAR_FIELD)?,
        })
    }

    /// Converts the envelope into the validated domain command.
    #[must_use]
    pub const fn into_command(self) -> MotionCommand {
        MotionCommand::new(self.linear, self.angular)
    }
}

/// Reads `field` from `map`, defaulting to `0.0` when absent.
fn number_field(map: &Map<String, Value>, field: &'static str) -> Result<f64, DecodeError> {
    match map.get(field) {
        None => Ok(0.0),
        Some(value) => coerce_number(field, value),
    }
}

/// Numeric coercion: numbers, booleans, and numeric strings are accepted.
fn coerce_number(field: &'static str, value: &Value) -> Result<f64, DecodeError> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(field, format!("{n} is out of range")))?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(field, format!("{s:?} is not a number")))?,
        Value::Null | Value::Array(_) | Value::Object(_) => {
            return Err(invalid(
                field,
                format!("{} is not a number", json_type_name(value)),
            ));
        }
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(invalid(field, format!("{number} is not finite")))
    }
}

fn invalid(field: &'static str, reason: String) -> DecodeError {
    DecodeError::InvalidField { field, reason }
}

/// Returns a human-readable JSON type name.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
