//! Command decoder: raw frame bytes to a validated [`MotionCommand`].
//!
//! Decoding is a pure function. The same input always yields the same
//! result and nothing outside the return value is touched.

use serde_json::Value;

use super::messages::{CMD_VEL, CommandEnvelope, TYPE_FIELD, json_type_name};
use crate::domain::MotionCommand;
use crate::error::DecodeError;

/// Successful outcome of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A `cmd_vel` document with valid numeric fields.
    Command(MotionCommand),
    /// A well-formed document of a kind the bridge does not act on.
    Skip {
        /// The `type` string, if one was present.
        kind: Option<String>,
    },
}

/// Decodes one inbound frame.
///
/// - Unparsable input yields [`DecodeError::Malformed`].
/// - A parsed value that is not an object yields
///   [`DecodeError::NotAnObject`].
/// - An object whose `type` is absent, not a string, or not `"cmd_vel"`
///   yields [`Decoded::Skip`].
/// - A `cmd_vel` object yields [`Decoded::Command`], with missing
///   `linear` / `angular` defaulting to `0.0`.
///
/// # Errors
///
/// Returns a [`DecodeError`] for malformed documents and for `cmd_vel`
/// fields that cannot be converted to finite numbers.
pub fn decode(raw: &[u8]) -> Result<Decoded, DecodeError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let map = match value {
        Value::Object(map) => map,
        other => return Err(DecodeError::NotAnObject(json_type_name(&other))),
    };

    match map.get(TYPE_FIELD) {
        Some(Value::String(kind)) if kind == CMD_VEL => {
            let envelope = CommandEnvelope::from_cmd_vel_object(&map)?;
            Ok(Decoded::Command(envelope.into_command()))
        }
        Some(Value::String(kind)) => Ok(Decoded::Skip {
            kind: Some(kind.clone()),
        }),
        _ => Ok(Decoded::Skip { kind: None }),
    }
}
