//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{LinkBenchError, Result};
use crate::telemetry::OutputFormat;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Byte source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Serial device path, or `-` for stdin
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-read timeout; a read that sees no bytes for this long returns "no data"
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Link Protocol decoding configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Largest declared payload length accepted before a frame is rejected as oversized
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

/// Latency statistics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

/// Report output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

// Default value functions
fn default_port() -> String { crate::serial::STDIN_SOURCE.to_string() }
fn default_baud_rate() -> u32 { crate::serial::DEFAULT_BAUD_RATE }
fn default_timeout_ms() -> u64 { 1000 }

fn default_max_payload_len() -> usize { crate::link::protocol::LINK_DEFAULT_MAX_PAYLOAD }

fn default_window_capacity() -> usize { crate::telemetry::latency::DEFAULT_WINDOW_CAPACITY }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_payload_len: default_max_payload_len(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use link_bench::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.source.port.is_empty() {
            return Err(invalid("source port cannot be empty"));
        }

        if self.source.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }

        if self.source.timeout_ms == 0 || self.source.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.link.max_payload_len == 0
            || self.link.max_payload_len > crate::link::protocol::LINK_MAX_WIRE_PAYLOAD
        {
            return Err(invalid("max_payload_len must be between 1 and 65535"));
        }

        if self.stats.window_capacity == 0 {
            return Err(invalid("window_capacity must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> LinkBenchError {
    LinkBenchError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();

        assert!(config.validate().is_ok());
        assert_eq!(config.source.port, "-");
        assert_eq!(config.source.baud_rate, 115_200);
        assert_eq!(config.source.timeout_ms, 1000);
        assert_eq!(config.link.max_payload_len, 4096);
        assert_eq!(config.stats.window_capacity, 1000);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[source]
port = "/dev/ttyUSB0"
baud_rate = 921600

[link]
max_payload_len = 256

[output]
format = "jsonl"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.source.port, "/dev/ttyUSB0");
        assert_eq!(config.source.baud_rate, 921_600);
        assert_eq!(config.source.timeout_ms, 1000);
        assert_eq!(config.link.max_payload_len, 256);
        assert_eq!(config.stats.window_capacity, 1000);
        assert_eq!(config.output.format, OutputFormat::Jsonl);
    }

    #[test]
    fn test_shipped_default_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.source.port, "/dev/ttyACM0");
        assert_eq!(config.link.max_payload_len, 4096);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.source.port, "-");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/link-bench.toml");
        assert!(matches!(result, Err(LinkBenchError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;

        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(b"[source\nport = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(LinkBenchError::Config(_))));
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[output]\nformat = \"csv\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_port() {
        let mut config = create_valid_config();
        config.source.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_baud_rate() {
        let mut config = create_valid_config();
        config.source.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = create_valid_config();
        config.source.timeout_ms = 0;
        assert!(config.validate().is_err());

        config.source.timeout_ms = 10001;
        assert!(config.validate().is_err());

        config.source.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_payload_bounds() {
        let mut config = create_valid_config();
        config.link.max_payload_len = 0;
        assert!(config.validate().is_err());

        config.link.max_payload_len = 65536;
        assert!(config.validate().is_err());

        config.link.max_payload_len = 65535;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_capacity() {
        let mut config = create_valid_config();
        config.stats.window_capacity = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("window_capacity"));
    }
}
