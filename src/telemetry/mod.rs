//! # Telemetry Module
//!
//! Derives delivery statistics from decoded ELEMENTAL_BUS frames.
//!
//! This module handles:
//! - Computing per-frame arrival latency against the sender timestamp
//! - Keeping a bounded window of recent latencies with running mean and jitter
//! - Formatting per-frame reports as text lines or JSON Lines

pub mod latency;
pub mod report;

pub use latency::{LatencySample, LatencyTracker};
pub use report::{ElementalReport, OutputFormat};
