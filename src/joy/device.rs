//! # Gamepad Device Module
//!
//! Opens a joystick through the Linux evdev interface and reads it on a
//! dedicated thread, forwarding [`Joy`] frames to the async event loop.
//!
//! ## Device Detection
//!
//! With no configured path, `/dev/input/event*` is scanned in order and the
//! first device that reports a gamepad or joystick trigger button
//! (`BTN_SOUTH` or `BTN_TRIGGER`) together with absolute axes is used.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::calibration::AxisCalibration;
use super::mapper::{is_joystick_key, JoyLayout, JoyMapper};
use super::Joy;
use crate::error::{Result, TeleopError};

/// Directory scanned during auto-detection
const INPUT_DIR: &str = "/dev/input";

/// Joystick handle
///
/// Represents an open evdev joystick together with the layout used to turn
/// its events into [`Joy`] frames.
pub struct GamepadDevice {
    device: Device,
    device_path: String,
    layout: JoyLayout,
}

impl std::fmt::Debug for GamepadDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamepadDevice")
            .field("device_path", &self.device_path)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Returns `true` if the device looks like a gamepad or joystick.
fn is_gamepad(device: &Device) -> bool {
    let has_trigger = device.supported_keys().map_or(false, |keys| {
        keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER)
    });
    has_trigger && device.supported_absolute_axes().is_some()
}

impl GamepadDevice {
    /// Open the configured joystick, or auto-detect one when `device_path` is empty
    ///
    /// # Arguments
    ///
    /// * `device_path` - `/dev/input/eventX` path, or empty for auto-detection
    /// * `deadzone` - Axis deadzone applied to every axis
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: auto-detection found no joystick
    /// - `Device`: the configured device cannot be opened or read
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joy_teleop::joy::device::GamepadDevice;
    ///
    /// let pad = GamepadDevice::open("", 0.05)?;
    /// println!("Connected to joystick at: {}", pad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: &str, deadzone: f32) -> Result<Self> {
        if device_path.is_empty() {
            Self::detect(deadzone)
        } else {
            Self::open_path(Path::new(device_path), deadzone)
        }
    }

    fn open_path(path: &Path, deadzone: f32) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            TeleopError::Device(format!("Failed to open {}: {}", path.display(), e))
        })?;

        if !is_gamepad(&device) {
            warn!(
                "{} does not report gamepad buttons, using it anyway",
                path.display()
            );
        }

        Self::from_device(device, path.to_string_lossy().to_string(), deadzone)
    }

    fn detect(deadzone: f32) -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);

        if !input_dir.exists() {
            return Err(TeleopError::Device(format!(
                "{} directory not found",
                INPUT_DIR
            )));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| TeleopError::Device(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TeleopError::Device(format!("Failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic device selection when multiple pads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("event"));
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if is_gamepad(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found joystick at: {}", device_path);
                        return Self::from_device(device, device_path, deadzone);
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(TeleopError::DeviceNotFound)
    }

    fn from_device(device: Device, device_path: String, deadzone: f32) -> Result<Self> {
        let buttons: Vec<Key> = device
            .supported_keys()
            .map(|keys| keys.iter().filter(|&key| is_joystick_key(key)).collect())
            .unwrap_or_default();

        let axis_types: Vec<AbsoluteAxisType> = device
            .supported_absolute_axes()
            .map(|axes| axes.iter().collect())
            .unwrap_or_default();

        let absinfo = device
            .get_abs_state()
            .map_err(|e| TeleopError::Device(format!("Failed to read axis ranges: {}", e)))?;

        let axes = axis_types
            .into_iter()
            .map(|axis| {
                let info = &absinfo[axis.0 as usize];
                (axis, AxisCalibration::new(info.minimum, info.maximum, deadzone))
            })
            .collect();

        let layout = JoyLayout::new(buttons, axes);
        info!(
            "Joystick {} has {} buttons and {} axes",
            device.name().unwrap_or("unnamed"),
            layout.num_buttons(),
            layout.num_axes()
        );

        Ok(Self {
            device,
            device_path,
            layout,
        })
    }

    /// Get the device path of this joystick
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Button and axis layout used for frames from this device
    pub fn layout(&self) -> &JoyLayout {
        &self.layout
    }

    /// Get joystick name from evdev
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Move the device onto a reader thread that sends a frame per `SYN_REPORT`
    ///
    /// The thread ends with `Ok(())` when the receiving side is dropped and
    /// with a `Device` error when the joystick stops delivering events
    /// (e.g. it was unplugged). Either way the sender is dropped, which closes
    /// the channel for the event loop.
    pub fn spawn_reader(self, tx: mpsc::Sender<Joy>) -> Result<JoinHandle<Result<()>>> {
        let GamepadDevice {
            mut device,
            device_path,
            layout,
        } = self;

        std::thread::Builder::new()
            .name("joy-reader".to_string())
            .spawn(move || {
                let mut mapper = JoyMapper::new(layout);
                loop {
                    let events = device.fetch_events().map_err(|e| {
                        TeleopError::Device(format!("Failed to fetch events from {}: {}", device_path, e))
                    })?;

                    for event in events {
                        if let Some(frame) = mapper.process_event(&event) {
                            if tx.blocking_send(frame).is_err() {
                                debug!("Joy receiver dropped, stopping reader for {}", device_path);
                                return Ok(());
                            }
                        }
                    }
                }
            })
            .map_err(TeleopError::Io)
    }
}
