//! # Link Frame Reader
//!
//! Pulls bytes from an async source and runs them through [`FrameDecoder`].

use std::io::ErrorKind;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::debug;

use super::decoder::FrameDecoder;
use super::protocol::Frame;
use crate::error::{LinkBenchError, Result};

/// Default per-read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Counters for every decode outcome seen by a reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_decoded: u64,
    pub checksum_failures: u64,
    pub incomplete_frames: u64,
    pub oversized_frames: u64,
    pub read_timeouts: u64,
}

impl LinkStats {
    fn record(&mut self, outcome: std::result::Result<&Frame, &LinkBenchError>) {
        match outcome {
            Ok(_) => self.frames_decoded += 1,
            Err(LinkBenchError::ChecksumMismatch { .. }) => self.checksum_failures += 1,
            Err(LinkBenchError::IncompleteFrame { .. }) => self.incomplete_frames += 1,
            Err(LinkBenchError::OversizedFrame { .. }) => self.oversized_frames += 1,
            Err(LinkBenchError::ReadTimeout) => self.read_timeouts += 1,
            Err(_) => {}
        }
    }

    /// Frame attempts that failed after a sync marker was matched
    pub fn rejected_frames(&self) -> u64 {
        self.checksum_failures + self.incomplete_frames + self.oversized_frames
    }
}

/// Reads validated frames from any `AsyncRead` byte source
///
/// Each call to [`read_frame`](Self::read_frame) is one decode attempt. A
/// failed attempt is returned as an error and the next call resumes scanning
/// for a sync marker right after the bytes already consumed.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    decoder: FrameDecoder,
    read_timeout: Duration,
    stats: LinkStats,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a reader with the given payload ceiling and per-read timeout
    pub fn new(inner: R, max_payload_len: usize, read_timeout: Duration) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: FrameDecoder::new(max_payload_len),
            read_timeout,
            stats: LinkStats::default(),
        }
    }

    /// Read the next frame
    ///
    /// # Errors
    ///
    /// * `ChecksumMismatch`, `IncompleteFrame`, `OversizedFrame` - This attempt
    ///   failed; call again to resynchronize
    /// * `ReadTimeout` - No bytes arrived within the read timeout while scanning
    /// * `SourceClosed` - EOF while scanning for a sync marker
    /// * `Io` - The source failed
    ///
    /// A timeout or EOF in the middle of a frame is reported as
    /// `IncompleteFrame`; the following call then sees the timeout or EOF.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while self.buf.has_remaining() {
                let byte = self.buf.get_u8();
                if let Some(outcome) = self.decoder.feed(byte) {
                    self.stats.record(outcome.as_ref());
                    return outcome;
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match timeout(self.read_timeout, self.inner.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Ok(Err(err)) => {
                    self.decoder.reset();
                    return Err(LinkBenchError::Io(err));
                }
                Err(_) => return Err(self.short_read(LinkBenchError::ReadTimeout)),
            };

            if read == 0 {
                return Err(self.short_read(LinkBenchError::SourceClosed));
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn short_read(&mut self, idle: LinkBenchError) -> LinkBenchError {
        let err = match self.decoder.abort() {
            Some(incomplete) => {
                debug!("Abandoning partial frame: {}", incomplete);
                incomplete
            }
            None => idle,
        };
        self.stats.record(Err(&err));
        err
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Per-read timeout
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::encoder::{encode_elemental_payload, encode_frame};
    use crate::link::protocol::{LINK_DEFAULT_MAX_PAYLOAD, LINK_FRAMETYPE_ELEMENTAL_BUS};
    use proptest::prelude::*;
    use tokio::io::AsyncWriteExt;

    const TEST_TIMEOUT: Duration = Duration::from_millis(50);

    fn elemental_frame(sequence: u16, timestamp: u32) -> Vec<u8> {
        let payload = encode_elemental_payload(10, -10, 64, -64);
        encode_frame(LINK_FRAMETYPE_ELEMENTAL_BUS, sequence, timestamp, &payload).unwrap()
    }

    /// Deterministic noise that never contains the first sync byte
    fn noise(len: usize, mut seed: u32) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                match (seed >> 16) as u8 {
                    0xAA => 0x00,
                    b => b,
                }
            })
            .collect()
    }

    fn reader_for(wire: &[u8]) -> FrameReader<&[u8]> {
        FrameReader::new(wire, LINK_DEFAULT_MAX_PAYLOAD, TEST_TIMEOUT)
    }

    #[tokio::test]
    async fn test_read_single_frame() {
        let wire = elemental_frame(123, 1000);
        let mut reader = reader_for(&wire);

        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.frame_type, 0x20);
        assert_eq!(frame.sequence, 123);
        assert_eq!(frame.length(), 4);
        assert_eq!(frame.timestamp, 1000);

        let reading = frame.elemental().unwrap();
        assert!((reading.earth - 0.079).abs() < 0.01);
        assert!((reading.air - (-0.079)).abs() < 0.01);
        assert!((reading.water - 0.504).abs() < 0.01);
        assert!((reading.fire - (-0.504)).abs() < 0.01);

        assert!(matches!(reader.read_frame().await, Err(LinkBenchError::SourceClosed)));
    }

    #[tokio::test]
    async fn test_read_multiple_frames() {
        let mut wire = elemental_frame(1, 10);
        wire.extend_from_slice(&encode_frame(0x05, 2, 20, b"raw").unwrap());
        wire.extend_from_slice(&elemental_frame(3, 30));

        let mut reader = reader_for(&wire);
        let f1 = reader.read_frame().await.unwrap();
        let f2 = reader.read_frame().await.unwrap();
        let f3 = reader.read_frame().await.unwrap();

        assert_eq!((f1.sequence, f2.sequence, f3.sequence), (1, 2, 3));
        assert_eq!(f2.payload.as_ref(), b"raw");
        assert_eq!(reader.stats().frames_decoded, 3);
    }

    #[tokio::test]
    async fn test_recovers_frame_after_noise() {
        let mut wire = noise(500, 0xC0FFEE);
        wire.extend_from_slice(&elemental_frame(42, 4242));

        let mut reader = reader_for(&wire);
        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.timestamp, 4242);

        assert!(matches!(reader.read_frame().await, Err(LinkBenchError::SourceClosed)));
        assert_eq!(reader.stats().frames_decoded, 1);
        assert_eq!(reader.stats().rejected_frames(), 0);
    }

    #[tokio::test]
    async fn test_checksum_rejection_then_resync() {
        let mut corrupted = elemental_frame(1, 100);
        corrupted[13] ^= 0x40;
        let mut wire = corrupted;
        wire.extend_from_slice(&elemental_frame(2, 200));

        let mut reader = reader_for(&wire);
        assert!(matches!(
            reader.read_frame().await,
            Err(LinkBenchError::ChecksumMismatch { .. })
        ));

        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.sequence, 2);
        assert_eq!(reader.stats().checksum_failures, 1);
        assert_eq!(reader.stats().frames_decoded, 1);
    }

    #[tokio::test]
    async fn test_oversized_then_resync() {
        let mut wire = encode_frame(0x33, 1, 1, &[0u8; 100]).unwrap();
        wire.extend_from_slice(&elemental_frame(2, 2));

        let mut reader = FrameReader::new(&wire[..], 16, TEST_TIMEOUT);
        assert!(matches!(
            reader.read_frame().await,
            Err(LinkBenchError::OversizedFrame { length: 100, max: 16 })
        ));
        assert_eq!(reader.read_frame().await.unwrap().sequence, 2);
        assert_eq!(reader.stats().oversized_frames, 1);
    }

    #[tokio::test]
    async fn test_eof_mid_frame_is_incomplete_then_closed() {
        let wire = elemental_frame(7, 7);
        let mut reader = reader_for(&wire[..8]);

        assert!(matches!(
            reader.read_frame().await,
            Err(LinkBenchError::IncompleteFrame { stage: "reading header" })
        ));
        assert!(matches!(reader.read_frame().await, Err(LinkBenchError::SourceClosed)));
        assert_eq!(reader.stats().incomplete_frames, 1);
    }

    #[tokio::test]
    async fn test_empty_source_is_closed() {
        let mut reader = reader_for(&[]);
        assert!(matches!(reader.read_frame().await, Err(LinkBenchError::SourceClosed)));
    }

    #[tokio::test]
    async fn test_partial_reads_are_reassembled() {
        let wire = elemental_frame(11, 1100);
        let source = tokio_test::io::Builder::new()
            .read(&wire[..1])
            .read(&wire[1..6])
            .read(&wire[6..14])
            .read(&wire[14..])
            .build();

        let mut reader = FrameReader::new(source, LINK_DEFAULT_MAX_PAYLOAD, TEST_TIMEOUT);
        assert_eq!(reader.read_frame().await.unwrap().sequence, 11);
        assert!(matches!(reader.read_frame().await, Err(LinkBenchError::SourceClosed)));
    }

    #[tokio::test]
    async fn test_idle_source_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(client, LINK_DEFAULT_MAX_PAYLOAD, TEST_TIMEOUT);

        assert!(matches!(reader.read_frame().await, Err(LinkBenchError::ReadTimeout)));
        assert_eq!(reader.stats().read_timeouts, 1);
    }

    #[tokio::test]
    async fn test_stalled_frame_times_out_as_incomplete() {
        let wire = elemental_frame(5, 5);
        let (client, mut server) = tokio::io::duplex(64);
        server.write_all(&wire[..12]).await.unwrap();

        let mut reader = FrameReader::new(client, LINK_DEFAULT_MAX_PAYLOAD, TEST_TIMEOUT);
        assert!(matches!(
            reader.read_frame().await,
            Err(LinkBenchError::IncompleteFrame { stage: "reading payload" })
        ));

        // The remainder of the stalled frame is scanned as noise, the next frame decodes
        server.write_all(&wire[12..]).await.unwrap();
        server.write_all(&elemental_frame(6, 6)).await.unwrap();
        assert_eq!(reader.read_frame().await.unwrap().sequence, 6);
    }

    proptest! {
        #[test]
        fn prop_resyncs_after_arbitrary_noise(
            garbage in prop::collection::vec(any::<u8>().prop_filter("no sync byte", |b| *b != 0xAA), 0..500),
            sequence in any::<u16>(),
            timestamp in any::<u32>(),
        ) {
            let mut wire = garbage;
            wire.extend_from_slice(&elemental_frame(sequence, timestamp));

            let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
            let frame = runtime.block_on(async {
                let mut reader = FrameReader::new(&wire[..], LINK_DEFAULT_MAX_PAYLOAD, TEST_TIMEOUT);
                reader.read_frame().await
            }).unwrap();

            prop_assert_eq!(frame.sequence, sequence);
            prop_assert_eq!(frame.timestamp, timestamp);
        }
    }
}
