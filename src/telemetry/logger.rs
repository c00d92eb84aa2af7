//! Rotating JSONL writer for diagnostics reports.
//!
//! Files are named `diagnostics_<YYYYmmdd_HHMMSS_micros>_<seq>.jsonl` so they
//! sort by creation order. A new file is started after `max_records_per_file`
//! records; only the newest `max_files_to_keep` files are retained.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::{Result, TeleopError};

const FILE_PREFIX: &str = "diagnostics_";
const FILE_SUFFIX: &str = ".jsonl";

/// Rotating JSONL telemetry logger
#[derive(Debug)]
pub struct TelemetryLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    files_created: u64,
}

impl TelemetryLogger {
    /// Create the logger, making `log_dir` if needed. No file is created
    /// until the first record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero limits and `Io` if the directory
    /// cannot be created.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        if config.max_records_per_file == 0 || config.max_files_to_keep == 0 {
            return Err(TeleopError::InvalidConfig(
                "telemetry limits must be greater than 0".to_string(),
            ));
        }

        let log_dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&log_dir)?;
        info!("Telemetry logging to {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            current: None,
            current_path: None,
            records_in_file: 0,
            files_created: 0,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Append one record as a JSON line
    ///
    /// # Errors
    ///
    /// Returns `Json` or `Io` on serialization or write failure.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if self.current.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.current.as_mut() {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.current.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.close()?;

        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S_%6f"),
            self.files_created,
            FILE_SUFFIX
        );
        let path = self.log_dir.join(name);
        let file = File::create(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.current = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;
        self.files_created += 1;

        self.prune()
    }

    /// Remove the oldest files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let mut files = self.log_files()?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old telemetry file {}: {}", path.display(), e);
            } else {
                debug!("Removed old telemetry file {}", path.display());
            }
        }
        Ok(())
    }

    /// Telemetry files currently in the log directory, unsorted
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.log_dir)? {
            let path = entry?.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
                .unwrap_or(false);
            if is_log {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
