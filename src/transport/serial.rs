//! # Serial Command Sink
//!
//! Publishes JSON-lines command frames over a serial link, for robot bases
//! driven by a microcontroller bridge.
//!
//! The port is opened 8N1 without flow control at the configured baud rate.
//! A configured path of `auto` tries the common USB serial paths in order.

use async_trait::async_trait;
use chrono::Utc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::link::{FrameLink, SerialLink};
use super::{encode_frame, CommandSink, Message};
use crate::error::{Result, TeleopError};

/// Path value that selects auto-detection
pub const AUTO_DETECT: &str = "auto";

/// Device paths tried by auto-detection, in order of preference
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Serial command sink
pub struct SerialSink<P: FrameLink> {
    link: P,
    device_path: String,
}

impl<P: FrameLink> std::fmt::Debug for SerialSink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialSink<SerialLink> {
    /// Open the serial port at `path`
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joy_teleop::transport::SerialSink;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let sink = SerialSink::open("/dev/ttyUSB0", 115200)?;
    ///     println!("Publishing to {}", sink.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        if path == AUTO_DETECT {
            return Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate);
        }
        Self::open_port(path, baud_rate)
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TeleopError::Serial(format!("Failed to open {}: {}", path, e)))?;

        info!("Opened serial command link at {} ({} baud)", path, baud_rate);
        Ok(Self::with_link(SerialLink::new(port), path))
    }

    /// Open the first of `paths` that succeeds
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(sink) => return Ok(sink),
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            }
        }

        Err(TeleopError::SerialPortNotFound(paths.join(", ")))
    }
}

impl<P: FrameLink> SerialSink<P> {
    /// Wrap an already open link
    pub fn with_link(link: P, device_path: &str) -> Self {
        Self {
            link,
            device_path: device_path.to_string(),
        }
    }

    /// Get the device path of the serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl<P: FrameLink> CommandSink for SerialSink<P> {
    async fn publish(&mut self, topic: &str, msg: &Message) -> Result<()> {
        let frame = encode_frame(topic, msg, Utc::now())?;

        self.link.send_frame(&frame).await.map_err(|e| TeleopError::Publish {
            topic: topic.to_string(),
            reason: format!("serial write on {} failed: {}", self.device_path, e),
        })?;

        debug!("Sent {} frame ({} bytes)", topic, frame.len());
        Ok(())
    }
}
