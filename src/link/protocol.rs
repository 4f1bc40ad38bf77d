//! # Link Protocol Constants and Types
//!
//! Core protocol definitions for Link Protocol frames.
//!
//! Wire layout:
//!
//! ```text
//! [0xAA][0x55][type:u8][seq:u16 LE][length:u16 LE][timestamp:u32 LE][payload][crc:u16 LE]
//! ```

use bytes::Bytes;

use super::crc::{crc16_ccitt, crc16_ccitt_with_seed};
use crate::error::{LinkBenchError, Result};

/// First byte of the sync marker
pub const LINK_SYNC_FIRST: u8 = 0xAA;

/// Second byte of the sync marker
pub const LINK_SYNC_SECOND: u8 = 0x55;

/// Full sync marker preceding every frame
pub const LINK_SYNC_MARKER: [u8; 2] = [LINK_SYNC_FIRST, LINK_SYNC_SECOND];

/// Header size after the sync marker: type(1) + seq(2) + length(2) + timestamp(4)
pub const LINK_HEADER_SIZE: usize = 9;

/// Trailing checksum size
pub const LINK_CRC_SIZE: usize = 2;

/// ELEMENTAL_BUS frame type
pub const LINK_FRAMETYPE_ELEMENTAL_BUS: u8 = 0x20;

/// Default ceiling for the declared payload length
pub const LINK_DEFAULT_MAX_PAYLOAD: usize = 4096;

/// Largest payload the 16-bit length field can describe
pub const LINK_MAX_WIRE_PAYLOAD: usize = u16::MAX as usize;

/// Fixed-size frame header (everything between the sync marker and the payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame type tag
    pub frame_type: u8,

    /// Sender-assigned sequence number
    pub sequence: u16,

    /// Declared payload length in bytes
    pub length: u16,

    /// Sender-side send time in milliseconds
    pub timestamp: u32,
}

impl FrameHeader {
    /// Parse a header from its 9 little-endian wire bytes
    pub fn parse(bytes: &[u8; LINK_HEADER_SIZE]) -> Self {
        Self {
            frame_type: bytes[0],
            sequence: u16::from_le_bytes([bytes[1], bytes[2]]),
            length: u16::from_le_bytes([bytes[3], bytes[4]]),
            timestamp: u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
        }
    }

    /// Serialize the header to its 9 wire bytes
    pub fn to_bytes(&self) -> [u8; LINK_HEADER_SIZE] {
        let mut out = [0u8; LINK_HEADER_SIZE];
        out[0] = self.frame_type;
        out[1..3].copy_from_slice(&self.sequence.to_le_bytes());
        out[3..5].copy_from_slice(&self.length.to_le_bytes());
        out[5..9].copy_from_slice(&self.timestamp.to_le_bytes());
        out
    }
}

/// A validated Link Protocol frame
///
/// Only produced once the checksum has been verified, so every field can be
/// trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type tag
    pub frame_type: u8,

    /// Sender-assigned sequence number
    pub sequence: u16,

    /// Sender-side send time in milliseconds
    pub timestamp: u32,

    /// Payload data (exactly `length` bytes)
    pub payload: Bytes,

    /// Checksum carried on the wire
    pub checksum: u16,
}

impl Frame {
    /// Create a new frame, computing its checksum
    ///
    /// # Errors
    ///
    /// Returns `OversizedFrame` if the payload does not fit the 16-bit length field
    pub fn new(frame_type: u8, sequence: u16, timestamp: u32, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > LINK_MAX_WIRE_PAYLOAD {
            return Err(LinkBenchError::OversizedFrame {
                length: payload.len(),
                max: LINK_MAX_WIRE_PAYLOAD,
            });
        }

        let header = FrameHeader {
            frame_type,
            sequence,
            length: payload.len() as u16,
            timestamp,
        };
        let checksum = crc16_ccitt_with_seed(&payload, crc16_ccitt(&header.to_bytes()));

        Ok(Self {
            frame_type,
            sequence,
            timestamp,
            payload,
            checksum,
        })
    }

    /// Declared payload length
    ///
    /// Always equals `payload.len()`, which is bounded by the 16-bit wire field.
    pub fn length(&self) -> u16 {
        self.payload.len() as u16
    }

    /// Header view of this frame
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            frame_type: self.frame_type,
            sequence: self.sequence,
            length: self.length(),
            timestamp: self.timestamp,
        }
    }

    /// Total number of bytes this frame occupies on the wire
    pub fn wire_len(&self) -> usize {
        LINK_SYNC_MARKER.len() + LINK_HEADER_SIZE + self.payload.len() + LINK_CRC_SIZE
    }
}
