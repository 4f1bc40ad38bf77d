//! # Error Types
//!
//! Custom error types for Link Bench using `thiserror`.

use thiserror::Error;

/// Main error type for Link Bench
#[derive(Debug, Error)]
pub enum LinkBenchError {
    /// Byte source ran short while a frame was being assembled
    #[error("Incomplete frame: short read while {stage}")]
    IncompleteFrame {
        /// Decoder stage that was waiting for bytes
        stage: &'static str,
    },

    /// Transmitted CRC does not match the CRC computed over the frame
    #[error("Checksum mismatch: got 0x{actual:04X} expected 0x{expected:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Declared payload length exceeds the configured ceiling
    #[error("Oversized frame: declared length {length} exceeds maximum {max}")]
    OversizedFrame { length: usize, max: usize },

    /// No bytes arrived within the source read timeout
    #[error("Read timed out waiting for data")]
    ReadTimeout,

    /// Byte source reached EOF
    #[error("Byte source closed")]
    SourceClosed,

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

impl LinkBenchError {
    /// Whether the read loop should resynchronize and keep going
    ///
    /// Frame-level failures and idle timeouts are local to one decode
    /// attempt. Everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LinkBenchError::IncompleteFrame { .. }
                | LinkBenchError::ChecksumMismatch { .. }
                | LinkBenchError::OversizedFrame { .. }
                | LinkBenchError::ReadTimeout
        )
    }
}

/// Result type alias for Link Bench
pub type Result<T> = std::result::Result<T, LinkBenchError>;
