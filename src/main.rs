//! # Joy Teleop
//!
//! Drive a mobile robot and its PTZ camera from a gamepad.
//!
//! Reads joystick frames from an evdev device (or JSON lines on stdin),
//! gates motion behind a dead-man button and publishes velocity and PTZ
//! commands as JSON lines on stdout or a serial port.
//!
//! # Usage
//!
//! ```bash
//! joy-teleop [config.toml]
//! ```
//!
//! Without an argument `config/default.toml` is used, or the built-in
//! defaults when that file does not exist. Logs go to stderr (or to daily
//! files under `logging.directory`) so stdout carries only commands.
//!
//! Expected output on stderr:
//! ```text
//! INFO joy_teleop: Joy Teleop v0.1.0 starting...
//! INFO joy_teleop: Pad type: ps3
//! INFO joy_teleop: Joystick "Sony PLAYSTATION(R)3 Controller" at /dev/input/event5
//! INFO joy_teleop::node: Teleop loop running
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use joy_teleop::config::{Config, InputSource, LoggingConfig, SinkKind};
use joy_teleop::joy::device::GamepadDevice;
use joy_teleop::joy::stream::spawn_stdin_reader;
use joy_teleop::joy::Joy;
use joy_teleop::node::{run_loop, LoopOptions, TeleopNode};
use joy_teleop::telemetry::TelemetryLogger;
use joy_teleop::transport::{CommandSink, SerialSink, WriterSink};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for daily log files
const LOG_FILE_NAME: &str = "joy-teleop.log";

/// How long runtime shutdown waits for blocking readers
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Running joy input source
enum Reader {
    Device(std::thread::JoinHandle<joy_teleop::error::Result<()>>),
    Stdin(tokio::task::JoinHandle<joy_teleop::error::Result<u64>>),
}

impl Reader {
    /// Log how the reader ended, if it has
    async fn report(self) {
        match self {
            Reader::Device(handle) if handle.is_finished() => match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Joystick reader failed: {}", e),
                Err(_) => error!("Joystick reader panicked"),
            },
            Reader::Stdin(handle) if handle.is_finished() => match handle.await {
                Ok(Ok(frames)) => info!("Read {} joy frames from stdin", frames),
                Ok(Err(e)) => error!("Stdin reader failed: {}", e),
                Err(e) => error!("Stdin reader task failed: {}", e),
            },
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let (config, source) = load_config(std::env::args().nth(1))?;
    let _guard = init_logging(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(run(config, source));

    // A pending stdin read parks a blocking thread
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

async fn run(config: Config, source: String) -> Result<()> {
    info!("Joy Teleop v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);
    info!("Pad type: {}", config.pad.pad_type);

    let (tx, rx) = mpsc::channel(config.input.channel_capacity);

    let reader = match config.input.source {
        InputSource::Evdev => {
            let pad = GamepadDevice::open(&config.input.device_path, config.input.deadzone)?;
            info!(
                "Joystick {:?} at {}",
                pad.name().unwrap_or("unknown"),
                pad.device_path()
            );
            pad.layout()
                .ensure_covers(config.buttons.required_len(), config.axes.required_len())?;
            Reader::Device(pad.spawn_reader(tx)?)
        }
        InputSource::Stdin => {
            info!("Reading joy frames from stdin");
            Reader::Stdin(spawn_stdin_reader(tx))
        }
    };

    match config.output.sink {
        SinkKind::Stdout => serve(&config, WriterSink::stdout(), rx).await?,
        SinkKind::Serial => {
            let sink = SerialSink::open(&config.output.serial_port, config.output.baud_rate)?;
            serve(&config, sink, rx).await?
        }
    }

    reader.report().await;
    Ok(())
}

/// Run the teleop node on `sink` until Ctrl+C or end of input
async fn serve<S: CommandSink>(config: &Config, sink: S, rx: mpsc::Receiver<Joy>) -> Result<()> {
    let mut node = TeleopNode::new(config, sink, Instant::now());
    if config.telemetry.enabled {
        node = node.with_telemetry(TelemetryLogger::new(&config.telemetry)?);
    }

    info!(
        "Publishing on {} and {}",
        config.topics.cmd_vel, config.topics.cmd_ptz
    );
    info!("Press Ctrl+C to exit");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run_loop(&mut node, rx, LoopOptions::from_config(config), shutdown).await;
    Ok(())
}

/// Load the configuration named on the command line, or the default file,
/// or the built-in defaults. Returns the config and where it came from.
fn load_config(arg: Option<String>) -> Result<(Config, String)> {
    if let Some(path) = arg {
        let config = Config::load(&path).with_context(|| format!("Failed to load {}", path))?;
        return Ok((config, path));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        let config = Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH))?;
        return Ok((config, DEFAULT_CONFIG_PATH.to_string()));
    }

    Ok((Config::default(), "built-in defaults".to_string()))
}

/// Set up tracing to stderr or to daily log files
///
/// `RUST_LOG` overrides the configured level. The returned guard must be kept
/// alive to flush buffered log lines.
fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level {:?}", config.level))?,
    };

    let to_file = !config.directory.is_empty();
    let (writer, guard) = if to_file {
        tracing_appender::non_blocking(tracing_appender::rolling::daily(
            &config.directory,
            LOG_FILE_NAME,
        ))
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!to_file)
        .init();

    Ok(guard)
}
