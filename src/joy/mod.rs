//! # Joy Module
//!
//! Joystick input handling.
//!
//! This module handles:
//! - The generic [`Joy`] frame (button states and normalized axes)
//! - Gamepad detection and reading via evdev
//! - Normalizing raw axis readings and applying deadzones
//! - Reading JSON-lines frames from stdin

pub mod calibration;
pub mod device;
pub mod frame;
pub mod mapper;
pub mod stream;

pub use frame::{Joy, BUTTON_PRESSED};
