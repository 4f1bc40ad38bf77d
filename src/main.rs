//! # Link Bench
//!
//! Listen on a serial port (or stdin) for Link Protocol frames, validate
//! them, and report arrival latency for ELEMENTAL_BUS frames.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use link_bench::config::Config;
use link_bench::error::LinkBenchError;
use link_bench::link::{Frame, FrameReader, LinkStats};
use link_bench::serial::LinkSource;
use link_bench::telemetry::{ElementalReport, LatencyTracker, OutputFormat};

/// Number of decoded frames between status log messages
const LOG_INTERVAL_FRAMES: u64 = 1000;

/// Command line arguments; any value given here overrides the config file
#[derive(Debug, Parser)]
#[command(name = "link-bench", version, about = "Bench for the Link Protocol")]
struct Cli {
    /// Serial port (e.g. /dev/ttyACM0), or `-` for stdin
    #[arg(long, visible_alias = "port", env = "LINK_BENCH_SERIAL")]
    serial: Option<String>,

    /// Baud rate
    #[arg(long, visible_alias = "rate")]
    baud: Option<u32>,

    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Reject frames declaring a longer payload than this
    #[arg(long)]
    max_payload: Option<usize>,
}

impl Cli {
    /// Load the config file (or defaults) and apply command line overrides
    fn resolve_config(&self) -> link_bench::error::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(serial) = &self.serial {
            config.source.port = serial.clone();
        }
        if let Some(baud) = self.baud {
            config.source.baud_rate = baud;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(max_payload) = self.max_payload {
            config.link.max_payload_len = max_payload;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Main entry point for Link Bench
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse arguments and resolve configuration
///    - Set up logging to stderr (stdout carries reports)
///    - Start a current-thread runtime and open the byte source
///
/// 2. **Main Loop**
///    - Read frames; failed attempts resync on the next call
///    - Print one report per ELEMENTAL_BUS frame
///    - Log link counters every 1000 frames
///
/// 3. **Shutdown**
///    - On Ctrl+C or EOF, drop the in-flight read and log totals
///
/// # Examples
///
/// ```bash
/// link-bench --serial /dev/ttyACM0 --baud 115200
/// producer | link-bench --serial - --format jsonl
/// ```
fn main() -> Result<()> {
    let cli = Cli::parse();

    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_writer(log_writer)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Link Bench v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = cli.resolve_config()?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(run(config));

    // A blocked stdin read would otherwise hold the runtime open until the next line arrives
    runtime.shutdown_background();
    result
}

async fn run(config: Config) -> Result<()> {
    let source = LinkSource::open(&config.source)?;
    info!("Listening on {}", source.description());
    info!("Press Ctrl+C to exit");

    let mut reader = FrameReader::new(
        source.into_reader(),
        config.link.max_payload_len,
        Duration::from_millis(config.source.timeout_ms),
    );
    let mut tracker = LatencyTracker::new(config.stats.window_capacity);
    let format = config.output.format;
    let mut out = std::io::stdout();
    let mut last_log_count: u64 = 0;

    loop {
        tokio::select! {
            result = reader.read_frame() => match result {
                Ok(frame) => {
                    if let Some(report) = process_frame(&frame, Local::now(), &mut tracker) {
                        writeln!(out, "{}", report.render(format)?)?;
                    }

                    let stats = reader.stats();
                    if stats.frames_decoded - last_log_count >= LOG_INTERVAL_FRAMES {
                        log_stats(&stats, &tracker);
                        last_log_count = stats.frames_decoded;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    debug!("Resyncing: {}", e);
                }
                Err(LinkBenchError::SourceClosed) => {
                    info!("Source closed, stopping");
                    break;
                }
                Err(e) => return Err(e.into()),
            },

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    log_stats(&reader.stats(), &tracker);
    Ok(())
}

/// Track latency for an ELEMENTAL_BUS frame and build its report
///
/// Other frame types are passed over.
fn process_frame(
    frame: &Frame,
    received_at: DateTime<Local>,
    tracker: &mut LatencyTracker,
) -> Option<ElementalReport> {
    let Some(reading) = frame.elemental() else {
        debug!(
            "Ignoring frame type 0x{:02X} seq {} ({} bytes)",
            frame.frame_type,
            frame.sequence,
            frame.payload.len()
        );
        return None;
    };

    let now_ms = u64::try_from(received_at.timestamp_millis()).unwrap_or(0);
    let sample = tracker.record(now_ms, frame.timestamp);

    Some(ElementalReport::new(
        received_at,
        frame.sequence,
        reading,
        sample,
        tracker.jitter_ms(),
    ))
}

fn log_stats(stats: &LinkStats, tracker: &LatencyTracker) {
    info!(
        "Frames: {} decoded, {} checksum failures, {} incomplete, {} oversized, {} read timeouts",
        stats.frames_decoded,
        stats.checksum_failures,
        stats.incomplete_frames,
        stats.oversized_frames,
        stats.read_timeouts
    );

    if let (Some(mean), Some(jitter)) = (tracker.mean_ms(), tracker.jitter_ms()) {
        info!(
            "Latency over last {} frames: avg {:.1}ms, jitter {:.1}ms",
            tracker.len(),
            mean,
            jitter
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use link_bench::link::protocol::LINK_FRAMETYPE_ELEMENTAL_BUS;

    #[test]
    fn test_log_interval_constant() {
        assert_eq!(LOG_INTERVAL_FRAMES, 1000);
    }

    #[test]
    fn test_process_elemental_frame() {
        let received_at = Local.timestamp_millis_opt(5_000).unwrap();
        let frame = Frame::new(LINK_FRAMETYPE_ELEMENTAL_BUS, 123, 4_960, vec![10u8, 0xF6, 64, 0xC0]).unwrap();
        let mut tracker = LatencyTracker::new(10);

        let report = process_frame(&frame, received_at, &mut tracker).unwrap();
        assert_eq!(report.sequence, 123);
        assert_eq!(tracker.len(), 1);
        assert!((report.reading.water - 0.504).abs() < 0.01);

        assert_eq!(report.latency_ms, 40);
        assert_eq!(report.mean_latency_ms, 40.0);
        assert_eq!(report.jitter_ms, Some(0.0));
    }

    #[test]
    fn test_process_other_frame_type_is_ignored() {
        let frame = Frame::new(0x21, 1, 0, vec![1u8, 2, 3, 4]).unwrap();
        let mut tracker = LatencyTracker::default();

        assert!(process_frame(&frame, Local::now(), &mut tracker).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = Cli::parse_from([
            "link-bench",
            "--serial",
            "/dev/ttyUSB1",
            "--rate",
            "57600",
            "--format",
            "jsonl",
            "--max-payload",
            "128",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.source.port, "/dev/ttyUSB1");
        assert_eq!(config.source.baud_rate, 57_600);
        assert_eq!(config.output.format, OutputFormat::Jsonl);
        assert_eq!(config.link.max_payload_len, 128);
    }

    #[test]
    fn test_cli_overrides_are_validated() {
        let cli = Cli::parse_from(["link-bench", "--max-payload", "0"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
