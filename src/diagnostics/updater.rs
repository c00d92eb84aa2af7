//! Periodic diagnostics report built from a set of frequency monitors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::frequency::{DiagnosticLevel, DiagnosticStatus, FrequencyMonitor};

/// Handle to a monitor registered with a [`DiagnosticsUpdater`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(usize);

/// One aggregated diagnostics report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub stamp: DateTime<Utc>,
    pub hardware_id: String,
    /// Worst level over all statuses
    pub level: DiagnosticLevel,
    pub statuses: Vec<DiagnosticStatus>,
}

/// Rate-limited diagnostics updater
///
/// `update` may be called as often as convenient; a report is produced at
/// most once per period.
#[derive(Debug)]
pub struct DiagnosticsUpdater {
    hardware_id: String,
    period: Duration,
    next_update: Instant,
    monitors: Vec<FrequencyMonitor>,
}

impl DiagnosticsUpdater {
    pub fn new(hardware_id: &str, period: Duration, now: Instant) -> Self {
        Self {
            hardware_id: hardware_id.to_string(),
            period,
            next_update: now + period,
            monitors: Vec::new(),
        }
    }

    /// Register a monitor and return its handle
    pub fn add(&mut self, monitor: FrequencyMonitor) -> MonitorId {
        self.monitors.push(monitor);
        MonitorId(self.monitors.len() - 1)
    }

    pub fn monitor(&self, id: MonitorId) -> Option<&FrequencyMonitor> {
        self.monitors.get(id.0)
    }

    /// Count one event on the given monitor
    pub fn tick(&mut self, id: MonitorId) {
        if let Some(monitor) = self.monitors.get_mut(id.0) {
            monitor.tick();
        }
    }

    /// Produce a report if the period has elapsed
    pub fn update(&mut self, now: Instant) -> Option<DiagnosticReport> {
        if now < self.next_update {
            return None;
        }
        Some(self.force_update(now))
    }

    /// Produce a report regardless of the period
    pub fn force_update(&mut self, now: Instant) -> DiagnosticReport {
        self.next_update = now + self.period;

        let statuses: Vec<DiagnosticStatus> =
            self.monitors.iter_mut().map(|m| m.update(now)).collect();

        for status in &statuses {
            match status.level {
                DiagnosticLevel::Ok => debug!(
                    "{}: {} ({:.1} Hz)",
                    status.name, status.message, status.frequency
                ),
                DiagnosticLevel::Warn => warn!(
                    "{}: {} ({:.1} Hz)",
                    status.name, status.message, status.frequency
                ),
                DiagnosticLevel::Error => error!("{}: {}", status.name, status.message),
            }
        }

        let level = statuses
            .iter()
            .map(|s| s.level)
            .max()
            .unwrap_or(DiagnosticLevel::Ok);

        DiagnosticReport {
            stamp: Utc::now(),
            hardware_id: self.hardware_id.clone(),
            level,
            statuses,
        }
    }
}
