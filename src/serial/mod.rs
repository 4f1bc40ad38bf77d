//! # Serial Communication Module
//!
//! Opens the byte source the bench reads Link Protocol frames from.
//!
//! This module handles:
//! - Opening a serial device (8N1, no flow control) at the configured baud rate
//! - Falling back to standard input when the source is `-`
//! - Exposing the source as a boxed `AsyncRead` for the frame reader

use std::fmt;

use tokio::io::AsyncRead;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{LinkBenchError, Result};

/// Default Link Protocol baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Source identifier that selects standard input
pub const STDIN_SOURCE: &str = "-";

/// Byte stream the frame reader consumes
pub type ByteSource = Box<dyn AsyncRead + Unpin + Send>;

/// An opened byte source and a description of where it came from
pub struct LinkSource {
    reader: ByteSource,
    description: String,
}

impl fmt::Debug for LinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSource")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl LinkSource {
    /// Open the source named in the configuration
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the device cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use link_bench::config::SourceConfig;
    /// use link_bench::serial::LinkSource;
    ///
    /// # #[tokio::main] async fn main() -> anyhow::Result<()> {
    /// let config = SourceConfig { port: "/dev/ttyACM0".to_string(), ..SourceConfig::default() };
    /// let source = LinkSource::open(&config)?;
    /// println!("Listening on {}", source.description());
    /// # Ok(()) }
    /// ```
    pub fn open(config: &SourceConfig) -> Result<Self> {
        if config.port == STDIN_SOURCE {
            info!("Reading Link Protocol frames from stdin");
            return Ok(Self::from_reader(tokio::io::stdin(), "stdin"));
        }

        debug!("Opening serial port {} at {} baud", config.port, config.baud_rate);
        let port = Self::open_port(&config.port, config.baud_rate)?;
        info!("Opened serial port {} at {} baud", config.port, config.baud_rate);

        Ok(Self::from_reader(port, config.port.clone()))
    }

    /// Wrap an already-open reader
    pub fn from_reader<R>(reader: R, description: impl Into<String>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            description: description.into(),
        }
    }

    /// Open a specific serial port with Link Protocol settings
    ///
    /// Must be called from within a tokio runtime.
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| LinkBenchError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Where the bytes come from (device path or "stdin")
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Hand the reader over to a frame reader
    pub fn into_reader(self) -> ByteSource {
        self.reader
    }
}
