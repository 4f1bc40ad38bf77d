//! # Link Bench Library
//!
//! Decode Link Protocol frames from a serial line and measure delivery
//! latency and jitter of ELEMENTAL_BUS frames.
//!
//! This library provides the frame synchronizer, decoder and CRC16-CCITT
//! engine, the ELEMENTAL_BUS payload codec, and the latency tracker used by
//! the `link-bench` binary.

pub mod config;
pub mod error;
pub mod link;
pub mod serial;
pub mod telemetry;
