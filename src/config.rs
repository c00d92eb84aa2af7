//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every key has a default, so an empty file is a valid
//! configuration. Defaults follow a PS3 pad on the Linux joydev layout.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, TeleopError};

/// Highest axis count a joystick event can carry (evdev `ABS_CNT`).
pub const MAX_AXES: usize = 64;

/// Highest button count accepted for `num_of_buttons`.
pub const MAX_BUTTONS: usize = 128;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub pad: PadConfig,
    pub axes: AxisConfig,
    pub scale: ScaleConfig,
    pub buttons: ButtonConfig,
    pub topics: TopicConfig,
    pub output: OutputConfig,
    pub diagnostics: DiagnosticsConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Where joystick frames come from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// Linux evdev gamepad
    Evdev,
    /// JSON-lines `Joy` frames on stdin
    Stdin,
}

/// Joystick input configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub source: InputSource,

    /// Empty means auto-detect
    pub device_path: String,

    pub deadzone: f32,

    /// Re-process the last frame at this rate while the pad is silent. 0 disables.
    pub autorepeat_hz: f64,

    pub channel_capacity: usize,
}

/// Pad description
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PadConfig {
    pub pad_type: String,
    pub num_of_buttons: usize,
}

/// Axis index mapping
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct AxisConfig {
    pub linear: usize,
    pub angular: usize,
    pub pan: usize,
    pub tilt: usize,
    pub zoom_wide: usize,
    pub zoom_tele: usize,
}

/// Output scaling multipliers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScaleConfig {
    pub linear: f64,
    pub angular: f64,
    pub pan: f64,
    pub tilt: f64,
    pub zoom: f64,
}

/// Button index mapping
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonConfig {
    pub dead_man: usize,
    pub update_ptz: usize,
    pub ptz_reset: usize,
    pub vel_inc: usize,
    pub vel_dec: usize,
    pub ptz_vel_inc: usize,
    pub ptz_vel_dec: usize,
}

/// Output topic names
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TopicConfig {
    pub cmd_vel: String,
    pub cmd_ptz: String,
}

/// Where published commands go
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Stdout,
    Serial,
}

/// Command output configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub sink: SinkKind,
    /// `auto` tries /dev/ttyACM0 then /dev/ttyUSB0
    pub serial_port: String,
    pub baud_rate: u32,
}

/// Diagnostics configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Rate of the driver loop that polls the updater
    pub rate_hz: f64,
    /// Minimum time between two diagnostics reports
    pub update_period_ms: u64,
    pub min_freq_joy: f64,
    pub max_freq_joy: f64,
    pub min_freq_command: f64,
    pub max_freq_command: f64,
    pub tolerance: f64,
    pub window_size: usize,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_dir: String,
    pub max_records_per_file: usize,
    pub max_files_to_keep: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Empty logs to stderr, otherwise daily rolling files in this directory
    pub directory: String,
}

// Default value functions
fn default_input_source() -> InputSource { InputSource::Evdev }
fn default_deadzone() -> f32 { 0.05 }
fn default_autorepeat_hz() -> f64 { 0.0 }
fn default_channel_capacity() -> usize { 64 }

fn default_pad_type() -> String { "ps3".to_string() }
fn default_num_of_buttons() -> usize { 16 }

fn default_axis_linear() -> usize { 1 }
fn default_axis_angular() -> usize { 2 }
fn default_axis_pan() -> usize { 0 }
fn default_axis_tilt() -> usize { 3 }
fn default_axis_zoom_wide() -> usize { 12 }
fn default_axis_zoom_tele() -> usize { 13 }

fn default_scale_linear() -> f64 { 1.0 }
fn default_scale_angular() -> f64 { 2.0 }
fn default_scale_pan() -> f64 { 1.0 }
fn default_scale_tilt() -> f64 { 1.0 }
fn default_scale_zoom() -> f64 { 1.0 }

fn default_button_dead_man() -> usize { 10 }
fn default_button_update_ptz() -> usize { 11 }
fn default_button_ptz_reset() -> usize { 15 }
fn default_button_vel_inc() -> usize { 12 }
fn default_button_vel_dec() -> usize { 14 }
fn default_button_ptz_vel_inc() -> usize { 4 }
fn default_button_ptz_vel_dec() -> usize { 6 }

fn default_cmd_topic_vel() -> String { "cmd_vel".to_string() }
fn default_cmd_topic_ptz() -> String { "ptz_cmd".to_string() }

fn default_sink() -> SinkKind { SinkKind::Stdout }
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }

fn default_diag_rate_hz() -> f64 { 50.0 }
fn default_update_period_ms() -> u64 { 1000 }
fn default_min_freq() -> f64 { 5.0 }
fn default_max_freq() -> f64 { 50.0 }
fn default_tolerance() -> f64 { 0.1 }
fn default_window_size() -> usize { 10 }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: default_input_source(),
            device_path: String::new(),
            deadzone: default_deadzone(),
            autorepeat_hz: default_autorepeat_hz(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            pad_type: default_pad_type(),
            num_of_buttons: default_num_of_buttons(),
        }
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            linear: default_axis_linear(),
            angular: default_axis_angular(),
            pan: default_axis_pan(),
            tilt: default_axis_tilt(),
            zoom_wide: default_axis_zoom_wide(),
            zoom_tele: default_axis_zoom_tele(),
        }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            linear: default_scale_linear(),
            angular: default_scale_angular(),
            pan: default_scale_pan(),
            tilt: default_scale_tilt(),
            zoom: default_scale_zoom(),
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            dead_man: default_button_dead_man(),
            update_ptz: default_button_update_ptz(),
            ptz_reset: default_button_ptz_reset(),
            vel_inc: default_button_vel_inc(),
            vel_dec: default_button_vel_dec(),
            ptz_vel_inc: default_button_ptz_vel_inc(),
            ptz_vel_dec: default_button_ptz_vel_dec(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            cmd_vel: default_cmd_topic_vel(),
            cmd_ptz: default_cmd_topic_ptz(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_diag_rate_hz(),
            update_period_ms: default_update_period_ms(),
            min_freq_joy: default_min_freq(),
            max_freq_joy: default_max_freq(),
            min_freq_command: default_min_freq(),
            max_freq_command: default_max_freq(),
            tolerance: default_tolerance(),
            window_size: default_window_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl ButtonConfig {
    /// All mapped buttons with their parameter names.
    pub fn roles(&self) -> [(&'static str, usize); 7] {
        [
            ("button_dead_man", self.dead_man),
            ("button_update_ptz", self.update_ptz),
            ("button_ptz_reset", self.ptz_reset),
            ("button_vel_inc", self.vel_inc),
            ("button_vel_dec", self.vel_dec),
            ("button_ptz_vel_inc", self.ptz_vel_inc),
            ("button_ptz_vel_dec", self.ptz_vel_dec),
        ]
    }

    /// Number of entries a `Joy` button array needs for this mapping.
    #[must_use]
    pub fn required_len(&self) -> usize {
        self.roles().iter().map(|&(_, idx)| idx + 1).max().unwrap_or(0)
    }
}

impl AxisConfig {
    /// All mapped axes with their parameter names.
    pub fn roles(&self) -> [(&'static str, usize); 6] {
        [
            ("axis_linear", self.linear),
            ("axis_angular", self.angular),
            ("axis_pan", self.pan),
            ("axis_tilt", self.tilt),
            ("axis_zoom_wide", self.zoom_wide),
            ("axis_zoom_tele", self.zoom_tele),
        ]
    }

    /// Number of entries a `Joy` axis array needs for this mapping.
    #[must_use]
    pub fn required_len(&self) -> usize {
        self.roles().iter().map(|&(_, idx)| idx + 1).max().unwrap_or(0)
    }
}

fn invalid(msg: impl Into<String>) -> TeleopError {
    TeleopError::InvalidConfig(msg.into())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joy_teleop::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        // Button indices must fit the declared pad
        if self.pad.num_of_buttons == 0 || self.pad.num_of_buttons > MAX_BUTTONS {
            return Err(invalid(format!(
                "num_of_buttons must be between 1 and {}",
                MAX_BUTTONS
            )));
        }

        let mut taken: HashMap<usize, &str> = HashMap::new();
        for (name, idx) in self.buttons.roles() {
            if idx >= self.pad.num_of_buttons {
                return Err(invalid(format!(
                    "{} = {} is out of bounds (num_of_buttons = {})",
                    name, idx, self.pad.num_of_buttons
                )));
            }
            // One press must not trigger two roles
            if let Some(other) = taken.insert(idx, name) {
                return Err(invalid(format!(
                    "{} and {} both map to button {}",
                    other, name, idx
                )));
            }
        }

        for (name, idx) in self.axes.roles() {
            if idx >= MAX_AXES {
                return Err(invalid(format!(
                    "{} = {} is out of bounds (must be 0-{})",
                    name,
                    idx,
                    MAX_AXES - 1
                )));
            }
        }

        for (name, value) in [
            ("scale_linear", self.scale.linear),
            ("scale_angular", self.scale.angular),
            ("scale_pan", self.scale.pan),
            ("scale_tilt", self.scale.tilt),
            ("scale_zoom", self.scale.zoom),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be a finite number", name)));
            }
        }

        // Topics
        if self.topics.cmd_vel.is_empty() || self.topics.cmd_ptz.is_empty() {
            return Err(invalid("cmd_topic_vel and cmd_topic_ptz cannot be empty"));
        }

        if self.topics.cmd_vel == self.topics.cmd_ptz {
            return Err(invalid("cmd_topic_vel and cmd_topic_ptz must differ"));
        }

        // Input
        if !(0.0..=0.5).contains(&self.input.deadzone) {
            return Err(invalid("deadzone must be between 0.0 and 0.5"));
        }

        if !self.input.autorepeat_hz.is_finite()
            || self.input.autorepeat_hz < 0.0
            || self.input.autorepeat_hz > 1000.0
        {
            return Err(invalid("autorepeat_hz must be between 0 and 1000"));
        }

        if self.input.channel_capacity == 0 {
            return Err(invalid("channel_capacity must be greater than 0"));
        }

        // Output
        if self.output.sink == SinkKind::Serial && self.output.serial_port.is_empty() {
            return Err(invalid("serial_port cannot be empty when sink = \"serial\""));
        }

        if self.output.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }

        // Diagnostics
        let diag = &self.diagnostics;
        if !diag.rate_hz.is_finite() || diag.rate_hz <= 0.0 || diag.rate_hz > 1000.0 {
            return Err(invalid("diagnostics rate_hz must be between 0 and 1000"));
        }

        if diag.update_period_ms == 0 || diag.update_period_ms > 60000 {
            return Err(invalid("update_period_ms must be between 1 and 60000"));
        }

        for (name, min, max) in [
            ("joy", diag.min_freq_joy, diag.max_freq_joy),
            ("command", diag.min_freq_command, diag.max_freq_command),
        ] {
            if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
                return Err(invalid(format!(
                    "min_freq_{0} must be non-negative and not above max_freq_{0}",
                    name
                )));
            }
        }

        if !(0.0..1.0).contains(&diag.tolerance) {
            return Err(invalid("tolerance must be in [0.0, 1.0)"));
        }

        if diag.window_size < 2 {
            return Err(invalid("window_size must be at least 2"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}
