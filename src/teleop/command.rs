//! # Command Messages
//!
//! Output messages produced by the teleop adapter.

use serde::{Deserialize, Serialize};

/// Three-component vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Planar velocity command. Only `linear.x` and `angular.z` are ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    /// All-zero command.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn planar(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear: Vector3 {
                x: linear_x,
                ..Vector3::default()
            },
            angular: Vector3 {
                z: angular_z,
                ..Vector3::default()
            },
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Pan/tilt/zoom camera command.
///
/// `relative = true` moves the camera by the given amounts;
/// `relative = false` drives it to the given absolute position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PtzCommand {
    pub relative: bool,
    pub pan: f32,
    pub tilt: f32,
    pub zoom: f32,
}

impl PtzCommand {
    #[must_use]
    pub fn relative(pan: f32, tilt: f32, zoom: f32) -> Self {
        Self {
            relative: true,
            pan,
            tilt,
            zoom,
        }
    }

    /// Absolute move to pan = tilt = zoom = 0.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            relative: false,
            pan: 0.0,
            tilt: 0.0,
            zoom: 0.0,
        }
    }
}

/// Everything one joy frame produced, in publish order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeleopCommands {
    /// PTZ commands from update and reset presses; published first.
    pub ptz: Vec<PtzCommand>,
    /// Always present; published after the PTZ commands.
    pub velocity: Twist,
    /// Dead-man state in this frame.
    pub enabled: bool,
}
