//! Byte link under the serial sink, split out so the sink can be tested
//! without hardware.

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncWriteExt;

/// A link that delivers whole encoded frames
#[async_trait]
pub trait FrameLink: Send {
    /// Write `frame` completely and flush it to the device
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Serial stream link
pub struct SerialLink {
    stream: tokio_serial::SerialStream,
}

impl SerialLink {
    pub fn new(stream: tokio_serial::SerialStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl FrameLink for SerialLink {
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }
}
