//! # ELEMENTAL_BUS Payload Codec
//!
//! Interprets the 4-byte ELEMENTAL_BUS payload as four signed readings.

use bytes::Bytes;
use serde::Serialize;

use super::protocol::{Frame, LINK_FRAMETYPE_ELEMENTAL_BUS};
use crate::error::{LinkBenchError, Result};

/// ELEMENTAL_BUS payload size
pub const ELEMENTAL_PAYLOAD_SIZE: usize = 4;

/// Divisor applied to each signed byte
///
/// The raw range is [-128, 127], so -128 normalizes to about -1.0079. The
/// sender's scale is kept as-is and the result is not clamped.
pub const ELEMENTAL_SCALE: f64 = 127.0;

/// Normalized ELEMENTAL_BUS readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElementalReading {
    pub earth: f64,
    pub air: f64,
    pub water: f64,
    pub fire: f64,
}

/// Decoded payload of a frame
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    /// ELEMENTAL_BUS frame with a 4-byte payload
    Elemental(ElementalReading),

    /// Any other type/length combination, passed through untouched
    Raw(Bytes),
}

/// Decode an ELEMENTAL_BUS payload
///
/// # Arguments
///
/// * `payload` - ELEMENTAL_BUS payload (exactly 4 bytes: earth, air, water, fire as i8)
///
/// # Errors
///
/// Returns `IncompleteFrame` if the payload is not exactly 4 bytes
pub fn decode_elemental(payload: &[u8]) -> Result<ElementalReading> {
    let raw: [u8; ELEMENTAL_PAYLOAD_SIZE] = payload
        .try_into()
        .map_err(|_| LinkBenchError::IncompleteFrame { stage: "decoding elemental payload" })?;

    Ok(ElementalReading {
        earth: normalize(raw[0]),
        air: normalize(raw[1]),
        water: normalize(raw[2]),
        fire: normalize(raw[3]),
    })
}

fn normalize(byte: u8) -> f64 {
    byte as i8 as f64 / ELEMENTAL_SCALE
}

impl Frame {
    /// Whether this frame carries an ELEMENTAL_BUS reading
    pub fn is_elemental(&self) -> bool {
        self.frame_type == LINK_FRAMETYPE_ELEMENTAL_BUS && self.payload.len() == ELEMENTAL_PAYLOAD_SIZE
    }

    /// ELEMENTAL_BUS reading, if this frame is one
    pub fn elemental(&self) -> Option<ElementalReading> {
        if !self.is_elemental() {
            return None;
        }
        decode_elemental(&self.payload).ok()
    }

    /// Interpret the payload according to the frame type
    pub fn interpret(&self) -> FramePayload {
        match self.elemental() {
            Some(reading) => FramePayload::Elemental(reading),
            None => FramePayload::Raw(self.payload.clone()),
        }
    }
}
