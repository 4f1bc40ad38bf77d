//! # Link Frame Decoder
//!
//! Byte-at-a-time frame synchronizer and decoder.
//!
//! The decoder never touches I/O. Bytes are pushed in with
//! [`FrameDecoder::feed`] and the decoder walks an explicit state machine:
//!
//! ```text
//! SeekingSync -> ReadingHeader -> ReadingPayload -> ReadingCrc -> { frame | error }
//! ```
//!
//! Every outcome, valid or not, returns the machine to `SeekingSync`. A byte
//! range that produced an error is never re-examined.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

use super::crc::crc16_ccitt;
use super::protocol::*;
use crate::error::{LinkBenchError, Result};

/// Decoder state for one frame-decode attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Scanning for `0xAA 0x55`; `saw_first` is set when the last byte was `0xAA`
    SeekingSync { saw_first: bool },

    /// Collecting the 9 header bytes
    ReadingHeader,

    /// Collecting `header.length` payload bytes
    ReadingPayload { header: FrameHeader },

    /// Collecting the 2 checksum bytes
    ReadingCrc { header: FrameHeader },
}

impl DecodeState {
    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            DecodeState::SeekingSync { .. } => "seeking sync",
            DecodeState::ReadingHeader => "reading header",
            DecodeState::ReadingPayload { .. } => "reading payload",
            DecodeState::ReadingCrc { .. } => "reading checksum",
        }
    }
}

/// Incremental Link Protocol decoder
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    /// CRC-covered bytes: header followed by payload
    body: BytesMut,
    crc: [u8; LINK_CRC_SIZE],
    crc_len: usize,
    max_payload_len: usize,
}

impl FrameDecoder {
    /// Create a decoder that rejects declared lengths above `max_payload_len`
    pub fn new(max_payload_len: usize) -> Self {
        Self {
            state: DecodeState::SeekingSync { saw_first: false },
            body: BytesMut::with_capacity(LINK_HEADER_SIZE + max_payload_len.min(LINK_DEFAULT_MAX_PAYLOAD)),
            crc: [0; LINK_CRC_SIZE],
            crc_len: 0,
            max_payload_len,
        }
    }

    /// Current state
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Payload ceiling in bytes
    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// Whether a sync marker has been matched and a frame is being assembled
    pub fn in_frame(&self) -> bool {
        !matches!(self.state, DecodeState::SeekingSync { .. })
    }

    /// Push one byte into the state machine
    ///
    /// # Returns
    ///
    /// * `None` - More bytes are needed
    /// * `Some(Ok(frame))` - A frame passed its checksum
    /// * `Some(Err(e))` - The attempt failed; the decoder is already back to seeking sync
    pub fn feed(&mut self, byte: u8) -> Option<Result<Frame>> {
        match self.state {
            DecodeState::SeekingSync { saw_first } => {
                if saw_first && byte == LINK_SYNC_SECOND {
                    trace!("Sync marker found");
                    self.body.clear();
                    self.crc_len = 0;
                    self.state = DecodeState::ReadingHeader;
                } else {
                    // A non-matching byte may itself open the next marker
                    self.state = DecodeState::SeekingSync {
                        saw_first: byte == LINK_SYNC_FIRST,
                    };
                }
                None
            }

            DecodeState::ReadingHeader => {
                self.body.put_u8(byte);
                if self.body.len() < LINK_HEADER_SIZE {
                    return None;
                }

                let mut raw = [0u8; LINK_HEADER_SIZE];
                raw.copy_from_slice(&self.body[..LINK_HEADER_SIZE]);
                let header = FrameHeader::parse(&raw);

                let length = header.length as usize;
                if length > self.max_payload_len {
                    warn!(
                        "Oversized frame: type 0x{:02X} seq {} declares {} bytes (max {})",
                        header.frame_type, header.sequence, length, self.max_payload_len
                    );
                    self.reset();
                    return Some(Err(LinkBenchError::OversizedFrame {
                        length,
                        max: self.max_payload_len,
                    }));
                }

                self.body.reserve(length);
                self.state = if length == 0 {
                    DecodeState::ReadingCrc { header }
                } else {
                    DecodeState::ReadingPayload { header }
                };
                None
            }

            DecodeState::ReadingPayload { header } => {
                self.body.put_u8(byte);
                if self.body.len() == LINK_HEADER_SIZE + header.length as usize {
                    self.state = DecodeState::ReadingCrc { header };
                }
                None
            }

            DecodeState::ReadingCrc { header } => {
                self.crc[self.crc_len] = byte;
                self.crc_len += 1;
                if self.crc_len < LINK_CRC_SIZE {
                    return None;
                }

                let outcome = self.finish(header);
                self.reset();
                Some(outcome)
            }
        }
    }

    /// Abandon any partially assembled frame
    ///
    /// Called when the byte source runs dry. Returns `IncompleteFrame` if a
    /// sync marker had already been matched, `None` if the decoder was still
    /// scanning.
    pub fn abort(&mut self) -> Option<LinkBenchError> {
        if !self.in_frame() {
            return None;
        }

        let stage = self.state.describe();
        self.reset();
        Some(LinkBenchError::IncompleteFrame { stage })
    }

    /// Return to `SeekingSync`, discarding any buffered frame bytes
    pub fn reset(&mut self) {
        self.state = DecodeState::SeekingSync { saw_first: false };
        self.body.clear();
        self.crc_len = 0;
    }

    fn finish(&mut self, header: FrameHeader) -> Result<Frame> {
        let actual = u16::from_le_bytes(self.crc);
        let expected = crc16_ccitt(&self.body);

        if actual != expected {
            warn!(
                "CRC error: got 0x{:04X} expected 0x{:04X} (type 0x{:02X}, {} payload bytes)",
                actual, expected, header.frame_type, header.length
            );
            return Err(LinkBenchError::ChecksumMismatch { expected, actual });
        }

        let payload = Bytes::copy_from_slice(&self.body[LINK_HEADER_SIZE..]);
        Ok(Frame {
            frame_type: header.frame_type,
            sequence: header.sequence,
            timestamp: header.timestamp,
            payload,
            checksum: actual,
        })
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(LINK_DEFAULT_MAX_PAYLOAD)
    }
}

/// Decode every complete frame in a byte slice
///
/// Convenience wrapper over [`FrameDecoder`] for buffered input. Failed
/// attempts are reported in order alongside valid frames; a trailing partial
/// frame is reported as `IncompleteFrame`.
pub fn decode_all(data: &[u8], max_payload_len: usize) -> Vec<Result<Frame>> {
    let mut decoder = FrameDecoder::new(max_payload_len);
    let mut outcomes: Vec<Result<Frame>> = data.iter().filter_map(|&byte| decoder.feed(byte)).collect();

    if let Some(err) = decoder.abort() {
        outcomes.push(Err(err));
    }

    outcomes
}
