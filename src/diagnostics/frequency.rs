//! # Frequency Monitor
//!
//! Checks that a topic is ticked within an expected frequency band.
//!
//! Each update records a `(count, time)` sample. The frequency is the number
//! of ticks since the oldest kept sample divided by the time since it, over a
//! sliding window of `window_size` samples.
//!
//! | Condition | Level | Message |
//! |---|---|---|
//! | no ticks in window | Error | No events recorded. |
//! | below `min * (1 - tolerance)` | Warn | Frequency too low. |
//! | above `max * (1 + tolerance)` | Warn | Frequency too high. |
//! | otherwise | Ok | Desired frequency met |

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

/// Severity of a diagnostic status, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

/// Result of one monitor update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticStatus {
    pub name: String,
    pub level: DiagnosticLevel,
    pub message: String,
    /// Ticks counted in the current window
    pub events_in_window: u64,
    /// Total ticks since start
    pub events_since_startup: u64,
    /// Measured frequency in Hz; 0 when no ticks were counted
    pub frequency: f64,
    pub window_secs: f64,
}

/// Expected frequency band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyParams {
    pub min_freq: f64,
    pub max_freq: f64,
    pub tolerance: f64,
    pub window_size: usize,
}

impl Default for FrequencyParams {
    fn default() -> Self {
        Self {
            min_freq: 5.0,
            max_freq: 50.0,
            tolerance: 0.1,
            window_size: 10,
        }
    }
}

/// Sliding-window frequency monitor for one topic.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use joy_teleop::diagnostics::frequency::{DiagnosticLevel, FrequencyMonitor, FrequencyParams};
///
/// let start = Instant::now();
/// let mut monitor = FrequencyMonitor::new("joy", FrequencyParams::default(), start);
///
/// for _ in 0..20 {
///     monitor.tick();
/// }
/// let status = monitor.update(start + Duration::from_secs(1));
/// assert_eq!(status.level, DiagnosticLevel::Ok);
/// assert_eq!(status.frequency, 20.0);
/// ```
#[derive(Debug, Clone)]
pub struct FrequencyMonitor {
    name: String,
    params: FrequencyParams,
    count: u64,
    history: VecDeque<(u64, Instant)>,
}

impl FrequencyMonitor {
    #[must_use]
    pub fn new(name: &str, params: FrequencyParams, now: Instant) -> Self {
        let window_size = params.window_size.max(1);
        let mut history = VecDeque::with_capacity(window_size + 1);
        history.push_back((0, now));

        Self {
            name: name.to_string(),
            params: FrequencyParams {
                window_size,
                ..params
            },
            count: 0,
            history,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Counts one event.
    pub fn tick(&mut self) {
        self.count += 1;
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Takes a sample at `now` and classifies the frequency over the window.
    pub fn update(&mut self, now: Instant) -> DiagnosticStatus {
        let (oldest_count, oldest_time) = self.history.front().copied().unwrap_or((0, now));

        let events = self.count - oldest_count;
        let window_secs = now.saturating_duration_since(oldest_time).as_secs_f64();
        let frequency = if events == 0 {
            0.0
        } else if window_secs > 0.0 {
            events as f64 / window_secs
        } else {
            f64::INFINITY
        };

        self.history.push_back((self.count, now));
        while self.history.len() > self.params.window_size {
            self.history.pop_front();
        }

        let (level, message) = self.classify(events, frequency);

        DiagnosticStatus {
            name: self.name.clone(),
            level,
            message: message.to_string(),
            events_in_window: events,
            events_since_startup: self.count,
            frequency,
            window_secs,
        }
    }

    fn classify(&self, events: u64, frequency: f64) -> (DiagnosticLevel, &'static str) {
        let p = &self.params;
        if events == 0 {
            (DiagnosticLevel::Error, "No events recorded.")
        } else if frequency < p.min_freq * (1.0 - p.tolerance) {
            (DiagnosticLevel::Warn, "Frequency too low.")
        } else if frequency > p.max_freq * (1.0 + p.tolerance) {
            (DiagnosticLevel::Warn, "Frequency too high.")
        } else {
            (DiagnosticLevel::Ok, "Desired frequency met")
        }
    }
}
