//! # Telemetry Module
//!
//! Persists diagnostics reports to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting records as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files

pub mod logger;

pub use logger::TelemetryLogger;
