//! # Elemental Report
//!
//! One output record per ELEMENTAL_BUS frame, printable as a console line or
//! a JSON Lines record.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::latency::LatencySample;
use crate::error::Result;
use crate::link::ElementalReading;

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable line
    #[default]
    Text,

    /// One JSON object per line
    Jsonl,
}

/// Decoded ELEMENTAL_BUS frame with its latency figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementalReport {
    pub received_at: DateTime<Local>,
    pub sequence: u16,
    #[serde(flatten)]
    pub reading: ElementalReading,
    pub latency_ms: i64,
    pub mean_latency_ms: f64,
    pub jitter_ms: Option<f64>,
}

impl ElementalReport {
    pub fn new(
        received_at: DateTime<Local>,
        sequence: u16,
        reading: ElementalReading,
        sample: LatencySample,
        jitter_ms: Option<f64>,
    ) -> Self {
        Self {
            received_at,
            sequence,
            reading,
            latency_ms: sample.latency_ms,
            mean_latency_ms: sample.mean_ms,
            jitter_ms,
        }
    }

    /// Serialize as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render in the requested format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Jsonl => self.to_json_line(),
        }
    }
}

impl fmt::Display for ElementalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} seq={} e={:.2} a={:.2} w={:.2} f={:.2} latency={}ms avg={:.0}ms",
            self.received_at.format("%H:%M:%S"),
            self.sequence,
            self.reading.earth,
            self.reading.air,
            self.reading.water,
            self.reading.fire,
            self.latency_ms,
            self.mean_latency_ms,
        )
    }
}
