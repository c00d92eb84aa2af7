//! # Command Transport Module
//!
//! Publishes velocity and PTZ commands on named topics.
//!
//! This module handles:
//! - The [`CommandSink`] trait the teleop node publishes through
//! - Encoding commands as JSON-lines frames
//! - Writing frames to stdout or any async writer
//! - Writing frames to a serial port
//!
//! ## Frame Format
//!
//! One JSON object per line:
//!
//! ```text
//! {"topic":"cmd_vel","stamp":"2024-05-01T12:00:00.000000Z","msg":{"linear":{"x":0.1,"y":0.0,"z":0.0},"angular":{"x":0.0,"y":0.0,"z":0.0}}}
//! {"topic":"ptz_cmd","stamp":"2024-05-01T12:00:00.000000Z","msg":{"relative":false,"pan":0.0,"tilt":0.0,"zoom":0.0}}
//! ```

pub mod link;
pub mod serial;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Result, TeleopError};
use crate::teleop::{PtzCommand, Twist};

pub use serial::SerialSink;

/// A command addressed to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Twist(Twist),
    Ptz(PtzCommand),
}

impl From<Twist> for Message {
    fn from(twist: Twist) -> Self {
        Message::Twist(twist)
    }
}

impl From<PtzCommand> for Message {
    fn from(ptz: PtzCommand) -> Self {
        Message::Ptz(ptz)
    }
}

#[derive(Serialize)]
struct Frame<'a> {
    topic: &'a str,
    stamp: String,
    msg: &'a Message,
}

/// Encode one JSON-lines frame, newline included
///
/// # Errors
///
/// Returns `Json` if the message cannot be serialized (non-finite values
/// are written as `null` by serde_json, so this is not expected in practice).
pub fn encode_frame(topic: &str, msg: &Message, stamp: DateTime<Utc>) -> Result<Bytes> {
    let frame = Frame {
        topic,
        stamp: stamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        msg,
    };

    let mut writer = BytesMut::with_capacity(192).writer();
    serde_json::to_writer(&mut writer, &frame)?;

    let mut buf = writer.into_inner();
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}

/// Destination for published commands
#[async_trait]
pub trait CommandSink: Send {
    /// Publish `msg` on `topic`
    async fn publish(&mut self, topic: &str, msg: &Message) -> Result<()>;
}

/// Sink writing JSON-lines frames to an async writer (stdout, a file, a buffer)
pub struct WriterSink<W> {
    writer: W,
    frames: u64,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    /// Number of frames written
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<tokio::io::Stdout> {
    /// Sink on the process stdout
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> CommandSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&mut self, topic: &str, msg: &Message) -> Result<()> {
        let frame = encode_frame(topic, msg, Utc::now())?;

        let to_publish_error = |e: std::io::Error| TeleopError::Publish {
            topic: topic.to_string(),
            reason: e.to_string(),
        };
        self.writer.write_all(&frame).await.map_err(to_publish_error)?;
        self.writer.flush().await.map_err(to_publish_error)?;

        self.frames += 1;
        trace!("Published on {} ({} bytes)", topic, frame.len());
        Ok(())
    }
}
