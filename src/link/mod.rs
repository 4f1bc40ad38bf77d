//! # Link Protocol Module
//!
//! Implementation of the Link Protocol framing used by the bench.
//!
//! This module handles:
//! - CRC16-CCITT checksum calculation
//! - Frame synchronization on the `0xAA 0x55` marker
//! - Header, payload and checksum decoding with resync on failure
//! - ELEMENTAL_BUS payload interpretation
//! - Frame encoding for loopback and test producers

pub mod protocol;
pub mod crc;
pub mod decoder;
pub mod elemental;
pub mod encoder;
pub mod reader;

pub use decoder::{DecodeState, FrameDecoder};
pub use elemental::{ElementalReading, FramePayload};
pub use protocol::{Frame, FrameHeader};
pub use reader::{FrameReader, LinkStats};
