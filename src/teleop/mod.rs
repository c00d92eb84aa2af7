//! # Teleop Module
//!
//! The joystick interpretation state machine.
//!
//! This module handles:
//! - Dead-man gating of velocity commands
//! - Rising-edge detection for one-shot buttons
//! - Velocity and PTZ speed scaling
//! - Building velocity and PTZ commands from axes

pub mod adapter;
pub mod command;
pub mod edge;
pub mod speed;

pub use adapter::{ButtonEdges, TeleopAdapter, TeleopState};
pub use command::{PtzCommand, TeleopCommands, Twist, Vector3};
