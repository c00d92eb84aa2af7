//! # Joy Teleop Library
//!
//! Drive a mobile robot and its PTZ camera from a gamepad.
//!
//! This library turns joystick frames into velocity and PTZ commands behind a
//! dead-man button, with stepped speed scaling and frequency diagnostics.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod joy;
pub mod node;
pub mod telemetry;
pub mod teleop;
pub mod transport;
