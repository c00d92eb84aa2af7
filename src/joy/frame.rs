//! # Joy Frame
//!
//! The generic joystick input event consumed by the teleop adapter.

use serde::{Deserialize, Serialize};

/// Button value reported for a held button.
pub const BUTTON_PRESSED: i32 = 1;

/// One snapshot of a joystick: every button state and every axis position.
///
/// Buttons are `0`/`1`; axes are normalized to `-1.0..=1.0`. Both arrays are
/// indexed by the positions the configuration maps to roles.
///
/// # Examples
///
/// ```
/// use joy_teleop::joy::Joy;
///
/// let joy = Joy::new(vec![0, 1], vec![0.5]);
/// assert!(joy.is_pressed(1));
/// assert!(!joy.is_pressed(0));
/// assert_eq!(joy.axis(0), Some(0.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Joy {
    #[serde(default)]
    pub buttons: Vec<i32>,
    #[serde(default)]
    pub axes: Vec<f32>,
}

impl Joy {
    #[must_use]
    pub fn new(buttons: Vec<i32>, axes: Vec<f32>) -> Self {
        Self { buttons, axes }
    }

    /// A frame with every button released and every axis centered.
    #[must_use]
    pub fn neutral(num_buttons: usize, num_axes: usize) -> Self {
        Self {
            buttons: vec![0; num_buttons],
            axes: vec![0.0; num_axes],
        }
    }

    /// `true` if the button exists and reads exactly [`BUTTON_PRESSED`].
    #[must_use]
    pub fn is_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).copied() == Some(BUTTON_PRESSED)
    }

    #[must_use]
    pub fn axis(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }
}
