//! # Speed Levels
//!
//! Runtime-adjustable speed scales, stepped by 0.1 between a floor and a
//! ceiling. Levels are stored in tenths so steps stay exact.

/// Velocity scale: 0.1 to 0.9, starting at 0.1.
pub const VEL_SPEED_MIN: u8 = 1;
pub const VEL_SPEED_MAX: u8 = 9;
pub const VEL_SPEED_INITIAL: u8 = 1;

/// PTZ scale: 0.2 to 0.9.
pub const PTZ_SPEED_MIN: u8 = 2;
pub const PTZ_SPEED_MAX: u8 = 9;
/// The PTZ scale starts at 1.0, above its ceiling. Decrements work from there;
/// increments are refused until it drops below the ceiling.
pub const PTZ_SPEED_INITIAL: u8 = 10;

/// A speed scale in tenths with a floor and a ceiling.
///
/// # Examples
///
/// ```
/// use joy_teleop::teleop::speed::SpeedLevel;
///
/// let mut speed = SpeedLevel::velocity();
/// assert_eq!(speed.value(), 0.1);
/// assert!(speed.step_up());
/// assert_eq!(speed.value(), 0.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedLevel {
    tenths: u8,
    min: u8,
    max: u8,
}

impl SpeedLevel {
    #[must_use]
    pub fn new(initial: u8, min: u8, max: u8) -> Self {
        Self {
            tenths: initial,
            min,
            max,
        }
    }

    /// Speed scale for velocity commands.
    #[must_use]
    pub fn velocity() -> Self {
        Self::new(VEL_SPEED_INITIAL, VEL_SPEED_MIN, VEL_SPEED_MAX)
    }

    /// Speed scale for PTZ commands.
    #[must_use]
    pub fn ptz() -> Self {
        Self::new(PTZ_SPEED_INITIAL, PTZ_SPEED_MIN, PTZ_SPEED_MAX)
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        f64::from(self.tenths) / 10.0
    }

    #[must_use]
    pub fn tenths(&self) -> u8 {
        self.tenths
    }

    #[must_use]
    pub fn percent(&self) -> u32 {
        u32::from(self.tenths) * 10
    }

    #[must_use]
    pub fn can_step_up(&self) -> bool {
        self.tenths < self.max
    }

    #[must_use]
    pub fn can_step_down(&self) -> bool {
        self.tenths > self.min
    }

    /// Raises the level by 0.1. Returns `false` at the ceiling.
    pub fn step_up(&mut self) -> bool {
        if !self.can_step_up() {
            return false;
        }
        self.tenths += 1;
        true
    }

    /// Lowers the level by 0.1. Returns `false` at the floor.
    pub fn step_down(&mut self) -> bool {
        if !self.can_step_down() {
            return false;
        }
        self.tenths -= 1;
        true
    }
}
