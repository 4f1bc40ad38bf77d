//! # Link Frame Encoder
//!
//! Builds Link Protocol frames for transmission and loopback testing.

use super::crc::{crc16_ccitt, crc16_ccitt_with_seed};
use super::elemental::ELEMENTAL_PAYLOAD_SIZE;
use super::protocol::*;
use crate::error::{LinkBenchError, Result};

/// Encode a complete Link Protocol frame
///
/// # Arguments
///
/// * `frame_type` - Frame type byte
/// * `sequence` - Sequence number
/// * `timestamp` - Sender-side time in milliseconds
/// * `payload` - Payload bytes (at most 65535)
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Sync marker + header + payload + CRC
///
/// # Examples
///
/// ```
/// use link_bench::link::encoder::{encode_elemental_payload, encode_frame};
///
/// let payload = encode_elemental_payload(10, -10, 64, -64);
/// let frame = encode_frame(0x20, 123, 1000, &payload)?;
/// assert_eq!(frame.len(), 17);
/// # Ok::<(), link_bench::error::LinkBenchError>(())
/// ```
pub fn encode_frame(frame_type: u8, sequence: u16, timestamp: u32, payload: &[u8]) -> Result<Vec<u8>> {
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
    }
    .to_bytes();

    // CRC covers Type + Sequence + Length + Timestamp + Payload
    let crc = crc16_ccitt_with_seed(payload, crc16_ccitt(&header));

    let mut frame = Vec::with_capacity(LINK_SYNC_MARKER.len() + LINK_HEADER_SIZE + payload.len() + LINK_CRC_SIZE);
    frame.extend_from_slice(&LINK_SYNC_MARKER);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// Encode the four raw ELEMENTAL_BUS readings into a payload
pub fn encode_elemental_payload(earth: i8, air: i8, water: i8, fire: i8) -> [u8; ELEMENTAL_PAYLOAD_SIZE] {
    [earth as u8, air as u8, water as u8, fire as u8]
}

impl Frame {
    /// Serialize this frame back to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_frame(self.frame_type, self.sequence, self.timestamp, &self.payload)
    }
}
