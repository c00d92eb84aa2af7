//! # Axis Calibration
//!
//! Normalizes raw evdev axis readings to the `-1.0..=1.0` range of a
//! [`Joy`](super::Joy) frame and applies a deadzone.
//!
//! ## Sign Convention
//!
//! Output follows the joydev convention used by ROS `joy`: pushing a stick
//! up or left gives a positive value. evdev reports the minimum raw value for
//! up/left, so the normalized value is negated.
//!
//! ## Deadzone
//!
//! Values within the deadzone map to 0.0; the remaining travel is rescaled so
//! full deflection still reaches ±1.0.
//!
//! ```
//! use joy_teleop::joy::calibration::AxisCalibration;
//!
//! let cal = AxisCalibration::new(0, 255, 0.05);
//!
//! // Stick fully up (raw minimum)
//! assert!((cal.normalize(0) - 1.0).abs() < 0.001);
//! // Near center
//! assert_eq!(cal.normalize(128), 0.0);
//! ```

/// Raw range and deadzone of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    minimum: i32,
    maximum: i32,
    /// Deadzone as a fraction (0.0 to 0.5).
    deadzone: f32,
}

impl Default for AxisCalibration {
    /// DualSense-style 8-bit axis with a 5% deadzone.
    fn default() -> Self {
        Self {
            minimum: 0,
            maximum: 255,
            deadzone: 0.05,
        }
    }
}

impl AxisCalibration {
    /// Creates a calibration for an axis reporting `minimum..=maximum`.
    ///
    /// The deadzone is clamped to 0.0..=0.5. A degenerate range
    /// (`maximum <= minimum`) always normalizes to 0.0.
    #[must_use]
    pub fn new(minimum: i32, maximum: i32, deadzone: f32) -> Self {
        Self {
            minimum,
            maximum,
            deadzone: deadzone.clamp(0.0, 0.5),
        }
    }

    #[must_use]
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    #[must_use]
    pub fn range(&self) -> (i32, i32) {
        (self.minimum, self.maximum)
    }

    /// Converts a raw reading to the joydev-style normalized value.
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f32 {
        if self.maximum <= self.minimum {
            return 0.0;
        }

        let min = self.minimum as f64;
        let max = self.maximum as f64;
        let center = (min + max) / 2.0;
        let half_range = (max - min) / 2.0;

        let scaled = ((raw as f64 - center) / half_range).clamp(-1.0, 1.0) as f32;

        -self.apply_deadzone(scaled)
    }

    /// Applies deadzone to a value already in -1.0..=1.0.
    #[inline]
    fn apply_deadzone(&self, input: f32) -> f32 {
        let abs_input = input.abs();
        if abs_input <= self.deadzone {
            0.0
        } else {
            input.signum() * (abs_input - self.deadzone) / (1.0 - self.deadzone)
        }
    }
}
