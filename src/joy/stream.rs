//! # JSON-Lines Joy Stream
//!
//! Reads [`Joy`] frames from any async line source, one JSON object per line:
//!
//! ```text
//! {"buttons":[0,0,0,0,0,0,0,0,0,0,1,0,0,0,0,0],"axes":[0.0,0.5,0.0,0.0]}
//! ```
//!
//! Blank lines are skipped. Lines that fail to parse are logged and skipped;
//! they never reach the teleop adapter.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Joy;
use crate::error::Result;

/// Forward every parsable line from `reader` to `tx`
///
/// Returns the number of frames forwarded once the reader hits EOF or the
/// receiver is dropped.
///
/// # Errors
///
/// Returns `Io` if reading from the source fails.
pub async fn forward_json_lines<R>(reader: R, tx: mpsc::Sender<Joy>) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded: u64 = 0;
    let mut line_no: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame: Joy = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping malformed joy frame on line {}: {}", line_no, e);
                continue;
            }
        };

        if tx.send(frame).await.is_err() {
            debug!("Joy receiver dropped after {} frames", forwarded);
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

/// Spawn a task forwarding JSON-lines frames from stdin
pub fn spawn_stdin_reader(tx: mpsc::Sender<Joy>) -> tokio::task::JoinHandle<Result<u64>> {
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        forward_json_lines(stdin, tx).await
    })
}
