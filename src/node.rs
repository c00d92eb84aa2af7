//! # Teleop Node
//!
//! Wires the [`TeleopAdapter`] to a [`CommandSink`], the frequency
//! diagnostics and the optional telemetry log, and runs the event loop.
//!
//! Per accepted joy frame, in order:
//!
//! 1. Publish each PTZ command on the PTZ topic, ticking the command monitor
//! 2. Publish the velocity command on the velocity topic
//! 3. Tick the joy monitor
//!
//! A failed publish is logged and does not stop the remaining publishes or
//! ticks. Adapter state is never rolled back.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, TopicConfig};
use crate::diagnostics::{
    DiagnosticReport, DiagnosticsUpdater, FrequencyMonitor, FrequencyParams, MonitorId,
};
use crate::error::{Result, TeleopError};
use crate::joy::Joy;
use crate::teleop::{TeleopAdapter, Twist};
use crate::telemetry::TelemetryLogger;
use crate::transport::{CommandSink, Message};

/// Name of the input-frequency monitor
pub const JOY_MONITOR: &str = "joy";

/// Hardware id reported with diagnostics
pub const HARDWARE_ID: &str = "none";

/// After the first dropped frame, only every this many drops is logged at warn
pub const DROP_WARN_EVERY: u64 = 100;

/// Counters kept by the node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Frames accepted by the adapter
    pub processed: u64,
    /// Frames rejected for a short button or axis array
    pub dropped: u64,
    /// Individual publishes that failed
    pub publish_failures: u64,
}

/// Teleop node
pub struct TeleopNode<S: CommandSink> {
    adapter: TeleopAdapter,
    sink: S,
    topics: TopicConfig,
    diagnostics: DiagnosticsUpdater,
    joy_freq: MonitorId,
    command_freq: MonitorId,
    telemetry: Option<TelemetryLogger>,
    stats: NodeStats,
}

impl<S: CommandSink> std::fmt::Debug for TeleopNode<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeleopNode")
            .field("topics", &self.topics)
            .field("state", self.adapter.state())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: CommandSink> TeleopNode<S> {
    pub fn new(config: &Config, sink: S, now: Instant) -> Self {
        let diag = &config.diagnostics;
        let mut diagnostics = DiagnosticsUpdater::new(
            HARDWARE_ID,
            Duration::from_millis(diag.update_period_ms),
            now,
        );

        let joy_freq = diagnostics.add(FrequencyMonitor::new(
            JOY_MONITOR,
            FrequencyParams {
                min_freq: diag.min_freq_joy,
                max_freq: diag.max_freq_joy,
                tolerance: diag.tolerance,
                window_size: diag.window_size,
            },
            now,
        ));
        let command_freq = diagnostics.add(FrequencyMonitor::new(
            &config.topics.cmd_ptz,
            FrequencyParams {
                min_freq: diag.min_freq_command,
                max_freq: diag.max_freq_command,
                tolerance: diag.tolerance,
                window_size: diag.window_size,
            },
            now,
        ));

        Self {
            adapter: TeleopAdapter::from_config(config),
            sink,
            topics: config.topics.clone(),
            diagnostics,
            joy_freq,
            command_freq,
            telemetry: None,
            stats: NodeStats::default(),
        }
    }

    /// Record every diagnostics report to `logger`
    pub fn with_telemetry(mut self, logger: TelemetryLogger) -> Self {
        self.telemetry = Some(logger);
        self
    }

    pub fn adapter(&self) -> &TeleopAdapter {
        &self.adapter
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    /// Events counted by the joy monitor
    pub fn joy_ticks(&self) -> u64 {
        self.diagnostics
            .monitor(self.joy_freq)
            .map(FrequencyMonitor::count)
            .unwrap_or(0)
    }

    /// Events counted by the PTZ command monitor
    pub fn command_ticks(&self) -> u64 {
        self.diagnostics
            .monitor(self.command_freq)
            .map(FrequencyMonitor::count)
            .unwrap_or(0)
    }

    /// Handle one joy frame
    ///
    /// # Errors
    ///
    /// Returns `InputContract` for a rejected frame, or the first `Publish`
    /// error of an accepted frame. Either way the frame is fully handled.
    pub async fn handle_joy(&mut self, joy: &Joy) -> Result<()> {
        let commands = match self.adapter.process(joy) {
            Ok(commands) => commands,
            Err(e) => {
                self.stats.dropped += 1;
                if warn_on_drop(self.stats.dropped) {
                    warn!("Dropping joy frame ({} so far): {}", self.stats.dropped, e);
                } else {
                    debug!("Dropping joy frame: {}", e);
                }
                return Err(e);
            }
        };
        self.stats.processed += 1;

        let mut first_error: Option<TeleopError> = None;

        for ptz in &commands.ptz {
            debug!("PTZ command: {:?}", ptz);
            let result = self.sink.publish(&self.topics.cmd_ptz, &Message::from(*ptz)).await;
            self.record(result, &mut first_error);
            self.diagnostics.tick(self.command_freq);
        }

        let result = self
            .sink
            .publish(&self.topics.cmd_vel, &Message::from(commands.velocity))
            .await;
        self.record(result, &mut first_error);
        self.diagnostics.tick(self.joy_freq);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: Result<()>, first_error: &mut Option<TeleopError>) {
        if let Err(e) = result {
            warn!("{}", e);
            self.stats.publish_failures += 1;
            first_error.get_or_insert(e);
        }
    }

    /// Run the diagnostics updater; returns the report when one was due
    pub fn update_diagnostics(&mut self, now: Instant) -> Option<DiagnosticReport> {
        let report = self.diagnostics.update(now)?;

        if let Some(logger) = self.telemetry.as_mut() {
            if let Err(e) = logger.write(&report) {
                warn!("Failed to write telemetry: {}", e);
            }
        }
        Some(report)
    }

    /// Publish a final zero velocity and close the telemetry log
    pub async fn shutdown(&mut self) {
        let stop = Message::from(Twist::zero());
        if let Err(e) = self.sink.publish(&self.topics.cmd_vel, &stop).await {
            warn!("Failed to publish stop command: {}", e);
        }

        if let Some(logger) = self.telemetry.as_mut() {
            if let Err(e) = logger.close() {
                warn!("Failed to close telemetry log: {}", e);
            }
        }

        info!(
            "Processed {} joy frames ({} dropped, {} publish failures)",
            self.stats.processed, self.stats.dropped, self.stats.publish_failures
        );
    }
}

fn warn_on_drop(dropped: u64) -> bool {
    dropped == 1 || dropped % DROP_WARN_EVERY == 0
}

/// Timing of the event loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOptions {
    /// Diagnostics driver period
    pub diagnostics_period: Duration,
    /// Re-process the last frame when no new frame arrived within this period
    pub autorepeat: Option<Duration>,
}

impl LoopOptions {
    pub fn from_config(config: &Config) -> Self {
        let autorepeat = if config.input.autorepeat_hz > 0.0 {
            Some(Duration::from_secs_f64(1.0 / config.input.autorepeat_hz))
        } else {
            None
        };

        Self {
            diagnostics_period: Duration::from_secs_f64(1.0 / config.diagnostics.rate_hz),
            autorepeat,
        }
    }
}

/// Run the node until the input channel closes or `shutdown` resolves
///
/// Frames are handled one at a time, in arrival order.
pub async fn run_loop<S, F>(
    node: &mut TeleopNode<S>,
    mut rx: mpsc::Receiver<Joy>,
    options: LoopOptions,
    shutdown: F,
) where
    S: CommandSink,
    F: Future<Output = ()>,
{
    let mut diagnostics_interval = interval(options.diagnostics_period);
    diagnostics_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Parked far in the future until the first frame arrives
    let idle = Duration::from_secs(3600);
    let repeat = sleep(options.autorepeat.unwrap_or(idle));
    tokio::pin!(repeat);
    tokio::pin!(shutdown);

    let mut last_frame: Option<Joy> = None;

    info!("Teleop loop running");

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(joy) = frame else {
                    info!("Joy input closed");
                    break;
                };
                // Errors are logged by the node
                let _ = node.handle_joy(&joy).await;
                if let Some(period) = options.autorepeat {
                    repeat.as_mut().reset(tokio::time::Instant::now() + period);
                }
                last_frame = Some(joy);
            }

            _ = diagnostics_interval.tick() => {
                node.update_diagnostics(Instant::now());
            }

            _ = &mut repeat, if options.autorepeat.is_some() && last_frame.is_some() => {
                if let Some(joy) = last_frame.as_ref() {
                    let _ = node.handle_joy(joy).await;
                }
                let period = options.autorepeat.unwrap_or(idle);
                repeat.as_mut().reset(tokio::time::Instant::now() + period);
            }

            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    node.shutdown().await;
}
