//! # Teleop Adapter
//!
//! Turns one [`Joy`] frame into a velocity command and zero or more PTZ
//! commands.
//!
//! ## Frame Handling
//!
//! For every frame, in order:
//!
//! 1. Reject the frame if it is shorter than the mapping needs (no state change)
//! 2. Dead-man held: apply speed down/up presses, then scale the linear and
//!    angular axes by the current speed
//! 3. Dead-man released: zero velocity, speed buttons are not looked at
//! 4. PTZ speed down/up presses
//! 5. PTZ update press: relative move from the pan, tilt and zoom axes
//! 6. PTZ reset press: absolute move to zero
//!
//! Publishing is left to the caller; see [`TeleopNode`](crate::node::TeleopNode).
//!
//! ## Usage
//!
//! ```
//! use joy_teleop::config::Config;
//! use joy_teleop::joy::Joy;
//! use joy_teleop::teleop::TeleopAdapter;
//!
//! let config = Config::default();
//! let mut adapter = TeleopAdapter::from_config(&config);
//!
//! let mut joy = Joy::neutral(16, 14);
//! joy.buttons[config.buttons.dead_man] = 1;
//! joy.axes[config.axes.linear] = 0.5;
//!
//! let commands = adapter.process(&joy)?;
//! assert_eq!(commands.velocity.linear.x, 0.1 * 1.0 * 0.5);
//! assert!(commands.ptz.is_empty());
//! # Ok::<(), joy_teleop::error::TeleopError>(())
//! ```

use tracing::info;

use super::command::{PtzCommand, TeleopCommands, Twist};
use super::edge::Edge;
use super::speed::SpeedLevel;
use crate::config::{AxisConfig, ButtonConfig, Config, ScaleConfig};
use crate::error::{Result, TeleopError};
use crate::joy::Joy;

/// One edge detector per button role. The dead-man button is level-triggered
/// and has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEdges {
    pub vel_dec: Edge,
    pub vel_inc: Edge,
    pub ptz_vel_dec: Edge,
    pub ptz_vel_inc: Edge,
    pub update_ptz: Edge,
    pub ptz_reset: Edge,
}

/// Mutable state carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeleopState {
    pub current_vel: SpeedLevel,
    pub ptz_vel: SpeedLevel,
    pub enabled: bool,
    pub edges: ButtonEdges,
}

impl Default for TeleopState {
    fn default() -> Self {
        Self {
            current_vel: SpeedLevel::velocity(),
            ptz_vel: SpeedLevel::ptz(),
            enabled: false,
            edges: ButtonEdges::default(),
        }
    }
}

/// Dead-man gated joystick to velocity/PTZ translator.
///
/// # Thread Safety
///
/// `TeleopAdapter` is not thread-safe. All frames must go through one owner;
/// the edge detectors rely on seeing every frame in order.
#[derive(Debug, Clone)]
pub struct TeleopAdapter {
    axes: AxisConfig,
    scale: ScaleConfig,
    buttons: ButtonConfig,
    required_buttons: usize,
    required_axes: usize,
    state: TeleopState,
}

impl TeleopAdapter {
    /// Creates an adapter with the initial speed levels.
    ///
    /// The mapping is expected to be validated already
    /// (see [`Config::validate`]).
    #[must_use]
    pub fn new(axes: AxisConfig, scale: ScaleConfig, buttons: ButtonConfig) -> Self {
        Self {
            required_buttons: buttons.required_len(),
            required_axes: axes.required_len(),
            axes,
            scale,
            buttons,
            state: TeleopState::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.axes, config.scale, config.buttons)
    }

    #[must_use]
    pub fn state(&self) -> &TeleopState {
        &self.state
    }

    /// Current velocity scale (0.1 to 0.9).
    #[must_use]
    pub fn current_vel(&self) -> f64 {
        self.state.current_vel.value()
    }

    /// Current PTZ scale.
    #[must_use]
    pub fn ptz_vel(&self) -> f64 {
        self.state.ptz_vel.value()
    }

    /// Dead-man state of the last accepted frame.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Checks that `joy` carries every mapped button and axis.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::InputContract`] for a short button or axis array.
    pub fn check(&self, joy: &Joy) -> Result<()> {
        if joy.buttons.len() < self.required_buttons {
            return Err(TeleopError::InputContract {
                kind: "buttons",
                required: self.required_buttons,
                actual: joy.buttons.len(),
            });
        }

        if joy.axes.len() < self.required_axes {
            return Err(TeleopError::InputContract {
                kind: "axes",
                required: self.required_axes,
                actual: joy.axes.len(),
            });
        }

        Ok(())
    }

    /// Processes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::InputContract`] if the frame is too short; the
    /// adapter state is left untouched in that case.
    pub fn process(&mut self, joy: &Joy) -> Result<TeleopCommands> {
        self.check(joy)?;

        let enabled = joy.is_pressed(self.buttons.dead_man);
        self.state.enabled = enabled;

        let velocity = if enabled {
            self.update_vel_speed(joy);
            let speed = self.state.current_vel.value();
            Twist::planar(
                speed * self.scale.linear * axis(joy, self.axes.linear),
                speed * self.scale.angular * axis(joy, self.axes.angular),
            )
        } else {
            Twist::zero()
        };

        self.update_ptz_speed(joy);

        let mut ptz = Vec::new();

        if self
            .state
            .edges
            .update_ptz
            .observe(joy.is_pressed(self.buttons.update_ptz))
        {
            ptz.push(self.relative_ptz(joy));
        }

        if self
            .state
            .edges
            .ptz_reset
            .observe(joy.is_pressed(self.buttons.ptz_reset))
        {
            ptz.push(PtzCommand::reset());
        }

        Ok(TeleopCommands {
            ptz,
            velocity,
            enabled,
        })
    }

    fn update_vel_speed(&mut self, joy: &Joy) {
        let state = &mut self.state;

        let can_step_down = state.current_vel.can_step_down();
        if state
            .edges
            .vel_dec
            .observe_if(joy.is_pressed(self.buttons.vel_dec), || can_step_down)
        {
            state.current_vel.step_down();
            info!("Velocity: {}%", state.current_vel.percent());
        }

        let can_step_up = state.current_vel.can_step_up();
        if state
            .edges
            .vel_inc
            .observe_if(joy.is_pressed(self.buttons.vel_inc), || can_step_up)
        {
            state.current_vel.step_up();
            info!("Velocity: {}%", state.current_vel.percent());
        }
    }

    fn update_ptz_speed(&mut self, joy: &Joy) {
        let state = &mut self.state;

        let can_step_down = state.ptz_vel.can_step_down();
        if state
            .edges
            .ptz_vel_dec
            .observe_if(joy.is_pressed(self.buttons.ptz_vel_dec), || can_step_down)
        {
            state.ptz_vel.step_down();
            info!("PTZ Velocity: {}%", state.ptz_vel.percent());
        }

        let can_step_up = state.ptz_vel.can_step_up();
        if state
            .edges
            .ptz_vel_inc
            .observe_if(joy.is_pressed(self.buttons.ptz_vel_inc), || can_step_up)
        {
            state.ptz_vel.step_up();
            info!("PTZ Velocity: {}%", state.ptz_vel.percent());
        }
    }

    fn relative_ptz(&self, joy: &Joy) -> PtzCommand {
        let speed = self.state.ptz_vel.value();
        let zoom_axis = joy.axes[self.axes.zoom_wide] - joy.axes[self.axes.zoom_tele];

        PtzCommand::relative(
            (-self.scale.pan * speed * axis(joy, self.axes.pan)) as f32,
            (self.scale.tilt * speed * axis(joy, self.axes.tilt)) as f32,
            (self.scale.zoom * f64::from(zoom_axis)) as f32,
        )
    }
}

/// Axis value widened for command math. Callers have passed [`TeleopAdapter::check`].
#[inline]
fn axis(joy: &Joy, index: usize) -> f64 {
    f64::from(joy.axes[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUM_BUTTONS: usize = 16;
    const NUM_AXES: usize = 14;

    fn adapter() -> TeleopAdapter {
        TeleopAdapter::from_config(&Config::default())
    }

    fn buttons() -> ButtonConfig {
        ButtonConfig::default()
    }

    fn axes() -> AxisConfig {
        AxisConfig::default()
    }

    /// Neutral frame with the given buttons held.
    fn frame(held: &[usize]) -> Joy {
        let mut joy = Joy::neutral(NUM_BUTTONS, NUM_AXES);
        for &idx in held {
            joy.buttons[idx] = 1;
        }
        joy
    }

    fn set_vel_level(adapter: &mut TeleopAdapter, tenths: u8) {
        adapter.state.current_vel = SpeedLevel::new(tenths, 1, 9);
    }

    // ==================== Input Contract Tests ====================

    #[test]
    fn test_short_buttons_rejected() {
        let mut adapter = adapter();
        let joy = Joy::neutral(NUM_BUTTONS - 1, NUM_AXES);
        match adapter.process(&joy) {
            Err(TeleopError::InputContract {
                kind,
                required,
                actual,
            }) => {
                assert_eq!(kind, "buttons");
                assert_eq!(required, 16);
                assert_eq!(actual, 15);
            }
            other => panic!("Expected InputContract error, got: {:?}", other),
        }
    }

    #[test]
    fn test_short_axes_rejected() {
        let mut adapter = adapter();
        let joy = Joy::neutral(NUM_BUTTONS, 4);
        assert!(matches!(
            adapter.process(&joy),
            Err(TeleopError::InputContract { kind: "axes", .. })
        ));
    }

    #[test]
    fn test_rejected_frame_leaves_state_untouched() {
        let mut adapter = adapter();
        let before = *adapter.state();

        // Dead-man and speed-up held, but the axis array is too short
        let mut joy = frame(&[buttons().dead_man, buttons().vel_inc]);
        joy.axes.truncate(2);
        assert!(adapter.process(&joy).is_err());

        assert_eq!(*adapter.state(), before);
    }

    #[test]
    fn test_longer_frames_accepted() {
        let mut adapter = adapter();
        let joy = Joy::neutral(32, 27);
        assert!(adapter.process(&joy).is_ok());
    }

    #[test]
    fn test_required_lengths_follow_mapping() {
        let mut axes = axes();
        axes.zoom_wide = 2;
        axes.zoom_tele = 3;
        let mut adapter = TeleopAdapter::new(axes, ScaleConfig::default(), buttons());
        assert!(adapter.process(&Joy::neutral(NUM_BUTTONS, 4)).is_ok());
    }

    // ==================== Dead-man Tests ====================

    #[test]
    fn test_dead_man_released_gives_zero_velocity() {
        let mut adapter = adapter();
        let mut joy = frame(&[]);
        joy.axes[axes().linear] = 1.0;
        joy.axes[axes().angular] = -1.0;

        let commands = adapter.process(&joy).unwrap();
        assert!(commands.velocity.is_zero());
        assert!(!commands.enabled);
        assert!(!adapter.is_enabled());
    }

    #[test]
    fn test_dead_man_held_scales_axes() {
        let mut adapter = adapter();
        set_vel_level(&mut adapter, 5);

        let mut joy = frame(&[buttons().dead_man]);
        joy.axes[axes().linear] = 0.8;
        joy.axes[axes().angular] = -0.3;

        let commands = adapter.process(&joy).unwrap();
        let scale = ScaleConfig::default();
        assert!(commands.enabled);
        assert_eq!(commands.velocity.linear.x, 0.5 * scale.linear * f64::from(0.8f32));
        assert_eq!(commands.velocity.angular.z, 0.5 * scale.angular * f64::from(-0.3f32));
        assert_eq!(commands.velocity.linear.y, 0.0);
        assert_eq!(commands.velocity.linear.z, 0.0);
        assert_eq!(commands.velocity.angular.x, 0.0);
        assert_eq!(commands.velocity.angular.y, 0.0);
    }

    #[test]
    fn test_dead_man_value_other_than_one_is_released() {
        let mut adapter = adapter();
        let mut joy = frame(&[]);
        joy.buttons[buttons().dead_man] = 2;
        joy.axes[axes().linear] = 1.0;

        let commands = adapter.process(&joy).unwrap();
        assert!(commands.velocity.is_zero());
    }

    // ==================== Velocity Speed Tests ====================

    #[test]
    fn test_speed_up_once_per_press() {
        let mut adapter = adapter();
        let held = frame(&[buttons().dead_man, buttons().vel_inc]);

        for _ in 0..5 {
            adapter.process(&held).unwrap();
        }
        assert_eq!(adapter.current_vel(), 0.2);
    }

    #[test]
    fn test_speed_up_after_release() {
        let mut adapter = adapter();
        let pressed = frame(&[buttons().dead_man, buttons().vel_inc]);
        let released = frame(&[buttons().dead_man]);

        adapter.process(&pressed).unwrap();
        adapter.process(&released).unwrap();
        adapter.process(&pressed).unwrap();
        assert_eq!(adapter.current_vel(), 0.3);
    }

    #[test]
    fn test_speed_applies_in_same_frame() {
        let mut adapter = adapter();
        let mut joy = frame(&[buttons().dead_man, buttons().vel_inc]);
        joy.axes[axes().linear] = 1.0;

        let commands = adapter.process(&joy).unwrap();
        assert_eq!(commands.velocity.linear.x, 0.2);
    }

    #[test]
    fn test_speed_ceiling() {
        let mut adapter = adapter();
        let pressed = frame(&[buttons().dead_man, buttons().vel_inc]);
        let released = frame(&[buttons().dead_man]);

        for _ in 0..15 {
            adapter.process(&pressed).unwrap();
            adapter.process(&released).unwrap();
        }
        assert_eq!(adapter.current_vel(), 0.9);
    }

    #[test]
    fn test_speed_down_at_floor_is_noop() {
        let mut adapter = adapter();
        let held = frame(&[buttons().dead_man, buttons().vel_dec]);

        adapter.process(&held).unwrap();
        adapter.process(&held).unwrap();
        assert_eq!(adapter.current_vel(), 0.1);
        // Refused press does not latch
        assert!(!adapter.state().edges.vel_dec.is_latched());
    }

    #[test]
    fn test_speed_down_held_from_half() {
        let mut adapter = adapter();
        set_vel_level(&mut adapter, 5);
        let held = frame(&[buttons().dead_man, buttons().vel_dec]);

        adapter.process(&held).unwrap();
        adapter.process(&held).unwrap();
        assert_eq!(adapter.current_vel(), 0.4);
    }

    #[test]
    fn test_speed_down_held_at_floor_retries_after_speed_up() {
        let mut adapter = adapter();
        let dec_held = frame(&[buttons().dead_man, buttons().vel_dec]);
        let both_held = frame(&[buttons().dead_man, buttons().vel_dec, buttons().vel_inc]);

        adapter.process(&dec_held).unwrap();
        // Increase fires, the still-unlatched decrease fires on the next frame
        adapter.process(&both_held).unwrap();
        assert_eq!(adapter.current_vel(), 0.2);
        adapter.process(&both_held).unwrap();
        assert_eq!(adapter.current_vel(), 0.1);
    }

    #[test]
    fn test_speed_buttons_ignored_without_dead_man() {
        let mut adapter = adapter();
        let joy = frame(&[buttons().vel_inc]);

        adapter.process(&joy).unwrap();
        assert_eq!(adapter.current_vel(), 0.1);
    }

    #[test]
    fn test_speed_latch_survives_dead_man_release() {
        let mut adapter = adapter();
        let inc = buttons().vel_inc;
        let dead_man = buttons().dead_man;

        adapter.process(&frame(&[dead_man, inc])).unwrap();
        assert_eq!(adapter.current_vel(), 0.2);

        // Released while the dead-man is up: the detector is not evaluated
        adapter.process(&frame(&[])).unwrap();
        adapter.process(&frame(&[dead_man, inc])).unwrap();
        assert_eq!(adapter.current_vel(), 0.2);

        // Released with the dead-man held unlatches it
        adapter.process(&frame(&[dead_man])).unwrap();
        adapter.process(&frame(&[dead_man, inc])).unwrap();
        assert_eq!(adapter.current_vel(), 0.3);
    }

    // ==================== PTZ Speed Tests ====================

    #[test]
    fn test_ptz_speed_initial_value() {
        assert_eq!(adapter().ptz_vel(), 1.0);
    }

    #[test]
    fn test_ptz_speed_independent_of_dead_man() {
        let mut adapter = adapter();
        adapter.process(&frame(&[buttons().ptz_vel_dec])).unwrap();
        assert_eq!(adapter.ptz_vel(), 0.9);
    }

    #[test]
    fn test_ptz_speed_increase_refused_above_ceiling() {
        let mut adapter = adapter();
        adapter.process(&frame(&[buttons().ptz_vel_inc])).unwrap();
        assert_eq!(adapter.ptz_vel(), 1.0);
    }

    #[test]
    fn test_ptz_speed_increase_steps_to_ceiling() {
        let mut adapter = adapter();
        let released = frame(&[]);

        let down = frame(&[buttons().ptz_vel_dec]);
        for _ in 0..5 {
            adapter.process(&down).unwrap();
            adapter.process(&released).unwrap();
        }
        assert_eq!(adapter.ptz_vel(), 0.5);

        let up = frame(&[buttons().ptz_vel_inc]);
        adapter.process(&up).unwrap();
        assert_eq!(adapter.ptz_vel(), 0.6);
        adapter.process(&up).unwrap();
        assert_eq!(adapter.ptz_vel(), 0.6);

        for expected in [0.7, 0.8, 0.9, 0.9] {
            adapter.process(&released).unwrap();
            adapter.process(&up).unwrap();
            assert_eq!(adapter.ptz_vel(), expected);
        }
    }

    #[test]
    fn test_ptz_speed_floor() {
        let mut adapter = adapter();
        let pressed = frame(&[buttons().ptz_vel_dec]);
        let released = frame(&[]);

        for _ in 0..15 {
            adapter.process(&pressed).unwrap();
            adapter.process(&released).unwrap();
        }
        assert_eq!(adapter.ptz_vel(), 0.2);
    }

    #[test]
    fn test_ptz_speed_held_changes_once() {
        let mut adapter = adapter();
        let held = frame(&[buttons().ptz_vel_dec]);
        for _ in 0..4 {
            adapter.process(&held).unwrap();
        }
        assert_eq!(adapter.ptz_vel(), 0.9);
    }

    // ==================== PTZ Command Tests ====================

    #[test]
    fn test_ptz_update_emits_relative_command() {
        let mut adapter = adapter();
        let scale = ScaleConfig::default();
        let mut joy = frame(&[buttons().update_ptz]);
        joy.axes[axes().pan] = 0.5;
        joy.axes[axes().tilt] = -0.25;
        joy.axes[axes().zoom_wide] = 1.0;
        joy.axes[axes().zoom_tele] = 0.25;

        let commands = adapter.process(&joy).unwrap();
        assert_eq!(commands.ptz.len(), 1);

        let ptz = commands.ptz[0];
        assert!(ptz.relative);
        assert_eq!(ptz.pan, (-scale.pan * 1.0 * 0.5) as f32);
        assert_eq!(ptz.tilt, (scale.tilt * 1.0 * -0.25) as f32);
        assert_eq!(ptz.zoom, (scale.zoom * 0.75) as f32);
    }

    #[test]
    fn test_ptz_update_uses_ptz_speed() {
        let mut adapter = adapter();
        adapter.process(&frame(&[buttons().ptz_vel_dec])).unwrap();
        adapter.process(&frame(&[])).unwrap();
        adapter.process(&frame(&[buttons().ptz_vel_dec])).unwrap();
        assert_eq!(adapter.ptz_vel(), 0.8);

        let mut joy = frame(&[buttons().update_ptz]);
        joy.axes[axes().pan] = 1.0;
        let commands = adapter.process(&joy).unwrap();
        assert_eq!(commands.ptz[0].pan, (-1.0 * 0.8 * 1.0f64) as f32);
    }

    #[test]
    fn test_ptz_update_once_per_press() {
        let mut adapter = adapter();
        let held = frame(&[buttons().update_ptz]);

        let emitted: usize = (0..5)
            .map(|_| adapter.process(&held).unwrap().ptz.len())
            .sum();
        assert_eq!(emitted, 1);

        adapter.process(&frame(&[])).unwrap();
        assert_eq!(adapter.process(&held).unwrap().ptz.len(), 1);
    }

    #[test]
    fn test_ptz_update_independent_of_dead_man() {
        let mut adapter = adapter();
        let commands = adapter.process(&frame(&[buttons().update_ptz])).unwrap();
        assert!(!commands.enabled);
        assert_eq!(commands.ptz.len(), 1);
    }

    #[test]
    fn test_ptz_reset_emits_absolute_zero() {
        let mut adapter = adapter();
        let mut joy = frame(&[buttons().ptz_reset]);
        joy.axes[axes().pan] = 1.0;

        let commands = adapter.process(&joy).unwrap();
        assert_eq!(commands.ptz, vec![PtzCommand::reset()]);

        // Held: nothing more
        assert!(adapter.process(&joy).unwrap().ptz.is_empty());
    }

    #[test]
    fn test_ptz_update_and_reset_same_frame() {
        let mut adapter = adapter();
        let joy = frame(&[buttons().update_ptz, buttons().ptz_reset]);

        let commands = adapter.process(&joy).unwrap();
        assert_eq!(commands.ptz.len(), 2);
        assert!(commands.ptz[0].relative);
        assert!(!commands.ptz[1].relative);
    }

    #[test]
    fn test_no_ptz_without_press() {
        let mut adapter = adapter();
        let mut joy = frame(&[buttons().dead_man]);
        joy.axes[axes().pan] = 1.0;
        assert!(adapter.process(&joy).unwrap().ptz.is_empty());
    }
}
