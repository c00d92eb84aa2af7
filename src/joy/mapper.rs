//! # Joy Frame Mapper
//!
//! Accumulates raw evdev events from a gamepad and emits a [`Joy`] frame on
//! every `SYN_REPORT`.
//!
//! ## Layout
//!
//! Button and axis positions in the frame follow the kernel joydev ordering:
//! the device's supported joystick, gamepad and d-pad keys sorted by key code,
//! and its absolute axes sorted by axis code. Indices therefore match what
//! `jstest` shows for the same pad.
//!
//! ## Usage
//!
//! ```
//! use evdev::{AbsoluteAxisType, EventType, InputEvent, Key, Synchronization};
//! use joy_teleop::joy::calibration::AxisCalibration;
//! use joy_teleop::joy::mapper::{JoyLayout, JoyMapper};
//!
//! let layout = JoyLayout::new(
//!     vec![Key::BTN_SOUTH, Key::BTN_EAST],
//!     vec![(AbsoluteAxisType::ABS_X, AxisCalibration::new(0, 255, 0.0))],
//! );
//! let mut mapper = JoyMapper::new(layout);
//!
//! mapper.process_event(&InputEvent::new(EventType::KEY, Key::BTN_EAST.code(), 1));
//! let frame = mapper
//!     .process_event(&InputEvent::new(
//!         EventType::SYNCHRONIZATION,
//!         Synchronization::SYN_REPORT.0,
//!         0,
//!     ))
//!     .unwrap();
//! assert_eq!(frame.buttons, vec![0, 1]);
//! ```

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key, Synchronization};

use super::calibration::AxisCalibration;
use super::Joy;
use crate::error::{Result, TeleopError};

/// First key code of the joystick button range (`BTN_JOYSTICK`).
const BTN_JOYSTICK_FIRST: u16 = 0x120;
/// Last key code of the gamepad button range (`BTN_THUMBR`).
const BTN_GAMEPAD_LAST: u16 = 0x13e;
/// D-pad keys reported by pads that expose the hat as buttons.
const BTN_DPAD_FIRST: u16 = 0x220;
const BTN_DPAD_LAST: u16 = 0x223;

/// Returns `true` for key codes that joydev exposes as joystick buttons.
#[must_use]
pub fn is_joystick_key(key: Key) -> bool {
    let code = key.code();
    (BTN_JOYSTICK_FIRST..=BTN_GAMEPAD_LAST).contains(&code)
        || (BTN_DPAD_FIRST..=BTN_DPAD_LAST).contains(&code)
}

/// Ordered buttons and calibrated axes of one device.
#[derive(Debug, Clone, Default)]
pub struct JoyLayout {
    buttons: Vec<Key>,
    axes: Vec<(AbsoluteAxisType, AxisCalibration)>,
}

impl JoyLayout {
    /// Builds a layout, sorting buttons by key code and axes by axis code.
    #[must_use]
    pub fn new(mut buttons: Vec<Key>, mut axes: Vec<(AbsoluteAxisType, AxisCalibration)>) -> Self {
        buttons.sort_by_key(|key| key.code());
        buttons.dedup();
        axes.sort_by_key(|(axis, _)| axis.0);
        axes.dedup_by_key(|(axis, _)| axis.0);
        Self { buttons, axes }
    }

    #[must_use]
    pub fn num_buttons(&self) -> usize {
        self.buttons.len()
    }

    #[must_use]
    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    /// Checks that frames from this layout reach every mapped index.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::InvalidConfig`] when the device has fewer
    /// buttons or axes than the mapping needs.
    pub fn ensure_covers(&self, required_buttons: usize, required_axes: usize) -> Result<()> {
        if self.num_buttons() < required_buttons {
            return Err(TeleopError::InvalidConfig(format!(
                "joystick has {} buttons, button mapping needs {}",
                self.num_buttons(),
                required_buttons
            )));
        }

        if self.num_axes() < required_axes {
            return Err(TeleopError::InvalidConfig(format!(
                "joystick has {} axes, axis mapping needs {}",
                self.num_axes(),
                required_axes
            )));
        }

        Ok(())
    }

    fn button_index(&self, key: Key) -> Option<usize> {
        self.buttons.iter().position(|&k| k == key)
    }

    fn axis_index(&self, axis: AbsoluteAxisType) -> Option<usize> {
        self.axes.iter().position(|(a, _)| *a == axis)
    }
}

/// Turns a stream of evdev events into [`Joy`] frames.
///
/// # Thread Safety
///
/// `JoyMapper` is not thread-safe. Use from the reader thread only.
#[derive(Debug)]
pub struct JoyMapper {
    layout: JoyLayout,
    frame: Joy,
}

impl JoyMapper {
    /// Creates a mapper with every button released and every axis centered.
    #[must_use]
    pub fn new(layout: JoyLayout) -> Self {
        let frame = Joy::neutral(layout.num_buttons(), layout.num_axes());
        Self { layout, frame }
    }

    #[must_use]
    pub fn layout(&self) -> &JoyLayout {
        &self.layout
    }

    /// Returns the frame as accumulated so far.
    #[must_use]
    pub fn frame(&self) -> &Joy {
        &self.frame
    }

    /// Processes one evdev event.
    ///
    /// Returns a snapshot of the frame when the event is a `SYN_REPORT`,
    /// `None` otherwise. Events for unmapped keys or axes are ignored.
    pub fn process_event(&mut self, event: &InputEvent) -> Option<Joy> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => {
                if let Some(idx) = self.layout.axis_index(axis) {
                    let calibration = self.layout.axes[idx].1;
                    self.frame.axes[idx] = calibration.normalize(event.value());
                }
                None
            }
            InputEventKind::Key(key) => {
                if let Some(idx) = self.layout.button_index(key) {
                    // Autorepeat (2) counts as held
                    self.frame.buttons[idx] = i32::from(event.value() != 0);
                }
                None
            }
            InputEventKind::Synchronization(sync) if sync == Synchronization::SYN_REPORT => {
                Some(self.frame.clone())
            }
            _ => None,
        }
    }

    /// Resets every button to released and every axis to center.
    pub fn reset(&mut self) {
        self.frame = Joy::neutral(self.layout.num_buttons(), self.layout.num_axes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    fn make_key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    fn make_syn_report() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0)
    }

    fn gamepad_layout() -> JoyLayout {
        let cal = AxisCalibration::new(0, 255, 0.0);
        JoyLayout::new(
            vec![Key::BTN_TL, Key::BTN_SOUTH, Key::BTN_EAST],
            vec![
                (AbsoluteAxisType::ABS_Y, cal),
                (AbsoluteAxisType::ABS_X, cal),
                (AbsoluteAxisType::ABS_HAT0X, AxisCalibration::new(-1, 1, 0.0)),
            ],
        )
    }

    #[test]
    fn test_layout_is_sorted_by_code() {
        let layout = gamepad_layout();
        assert_eq!(layout.buttons, vec![Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_TL]);
        let axes: Vec<_> = layout.axes.iter().map(|(a, _)| *a).collect();
        assert_eq!(
            axes,
            vec![
                AbsoluteAxisType::ABS_X,
                AbsoluteAxisType::ABS_Y,
                AbsoluteAxisType::ABS_HAT0X
            ]
        );
    }

    #[test]
    fn test_layout_covers_mapping() {
        let layout = gamepad_layout();
        assert!(layout.ensure_covers(3, 3).is_ok());
        assert!(layout.ensure_covers(1, 2).is_ok());
    }

    #[test]
    fn test_layout_too_few_axes() {
        // Six-axis pad against a mapping that reaches axis 13
        let cal = AxisCalibration::new(0, 255, 0.0);
        let axes = [
            AbsoluteAxisType::ABS_X,
            AbsoluteAxisType::ABS_Y,
            AbsoluteAxisType::ABS_Z,
            AbsoluteAxisType::ABS_RX,
            AbsoluteAxisType::ABS_RY,
            AbsoluteAxisType::ABS_RZ,
        ];
        let buttons: Vec<Key> = (0x120..=0x13e).map(Key::new).collect();
        let layout = JoyLayout::new(buttons, axes.iter().map(|&a| (a, cal)).collect());

        match layout.ensure_covers(16, 14) {
            Err(TeleopError::InvalidConfig(msg)) => {
                assert!(msg.contains("6 axes"));
                assert!(msg.contains("needs 14"));
            }
            other => panic!("Expected InvalidConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_layout_too_few_buttons() {
        let layout = gamepad_layout();
        match layout.ensure_covers(16, 3) {
            Err(TeleopError::InvalidConfig(msg)) => assert!(msg.contains("3 buttons")),
            other => panic!("Expected InvalidConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_layout_dedups() {
        let layout = JoyLayout::new(vec![Key::BTN_SOUTH, Key::BTN_SOUTH], vec![]);
        assert_eq!(layout.num_buttons(), 1);
    }

    #[test]
    fn test_initial_frame_is_neutral() {
        let mapper = JoyMapper::new(gamepad_layout());
        assert_eq!(mapper.frame(), &Joy::neutral(3, 3));
    }

    #[test]
    fn test_no_frame_without_syn_report() {
        let mut mapper = JoyMapper::new(gamepad_layout());
        assert!(mapper.process_event(&make_key_event(Key::BTN_SOUTH, 1)).is_none());
        assert!(mapper
            .process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 0))
            .is_none());
    }

    #[test]
    fn test_frame_on_syn_report() {
        let mut mapper = JoyMapper::new(gamepad_layout());

        mapper.process_event(&make_key_event(Key::BTN_TL, 1));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_Y, 0));
        let frame = mapper.process_event(&make_syn_report()).unwrap();

        assert_eq!(frame.buttons, vec![0, 0, 1]);
        assert!((frame.axes[1] - 1.0).abs() < 0.001); // Stick up is positive
        assert_eq!(frame.axes[0], 0.0);
    }

    #[test]
    fn test_button_release() {
        let mut mapper = JoyMapper::new(gamepad_layout());

        mapper.process_event(&make_key_event(Key::BTN_EAST, 1));
        let frame = mapper.process_event(&make_syn_report()).unwrap();
        assert!(frame.is_pressed(1));

        mapper.process_event(&make_key_event(Key::BTN_EAST, 0));
        let frame = mapper.process_event(&make_syn_report()).unwrap();
        assert!(!frame.is_pressed(1));
    }

    #[test]
    fn test_key_autorepeat_counts_as_pressed() {
        let mut mapper = JoyMapper::new(gamepad_layout());
        mapper.process_event(&make_key_event(Key::BTN_SOUTH, 2));
        let frame = mapper.process_event(&make_syn_report()).unwrap();
        assert_eq!(frame.buttons[0], 1);
    }

    #[test]
    fn test_hat_axis_mapping() {
        let mut mapper = JoyMapper::new(gamepad_layout());
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 1));
        let frame = mapper.process_event(&make_syn_report()).unwrap();
        assert!((frame.axes[2] - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_unmapped_events_ignored() {
        let mut mapper = JoyMapper::new(gamepad_layout());
        mapper.process_event(&make_key_event(Key::BTN_NORTH, 1));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_RZ, 0));
        let frame = mapper.process_event(&make_syn_report()).unwrap();
        assert_eq!(frame, Joy::neutral(3, 3));
    }

    #[test]
    fn test_reset() {
        let mut mapper = JoyMapper::new(gamepad_layout());
        mapper.process_event(&make_key_event(Key::BTN_SOUTH, 1));
        mapper.process_event(&make_axis_event(AbsoluteAxisType::ABS_X, 0));
        mapper.reset();
        assert_eq!(mapper.frame(), &Joy::neutral(3, 3));
    }

    #[test]
    fn test_is_joystick_key() {
        assert!(is_joystick_key(Key::BTN_TRIGGER));
        assert!(is_joystick_key(Key::BTN_SOUTH));
        assert!(is_joystick_key(Key::BTN_THUMBR));
        assert!(is_joystick_key(Key::BTN_DPAD_UP));
        assert!(!is_joystick_key(Key::KEY_A));
        assert!(!is_joystick_key(Key::BTN_LEFT));
    }
}
