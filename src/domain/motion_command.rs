//! Validated motion command and its control-topic representation.

use serde::Serialize;

/// A validated velocity command for a planar robot base.
///
/// Only constructed by the command decoder from a `cmd_vel` envelope, so
/// holding one means both components are finite numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionCommand {
    linear: f64,
    angular: f64,
}

impl MotionCommand {
    /// Builds a command from already-validated finite components.
    pub(crate) const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Forward velocity in m/s.
    #[must_use]
    pub const fn linear(&self) -> f64 {
        self.linear
    }

    /// Yaw rate in rad/s.
    #[must_use]
    pub const fn angular(&self) -> f64 {
        self.angular
    }
}

/// Three-component vector as carried by a [`Twist`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vector3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

/// Velocity message published on the control topic
/// (`geometry_msgs/Twist` layout).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Twist {
    /// Linear velocity; only `x` is driven by the bridge.
    pub linear: Vector3,
    /// Angular velocity; only `z` is driven by the bridge.
    pub angular: Vector3,
}

impl From<MotionCommand> for Twist {
    fn from(cmd: MotionCommand) -> Self {
        Self {
            linear: Vector3 {
                x: cmd.linear,
                ..Vector3::default()
            },
            angular: Vector3 {
                z: cmd.angular,
                ..Vector3::default()
            },
        }
    }
}
