//! # Diagnostics Module
//!
//! Frequency monitoring for the input and output topics.
//!
//! This module handles:
//! - Counting events per topic
//! - Sliding-window frequency checks against an expected band
//! - Rate-limited aggregated reports

pub mod frequency;
pub mod updater;

pub use frequency::{DiagnosticLevel, DiagnosticStatus, FrequencyMonitor, FrequencyParams};
pub use updater::{DiagnosticReport, DiagnosticsUpdater, MonitorId};
