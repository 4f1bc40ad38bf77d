//! # Latency/Jitter Tracker
//!
//! Bounded window of arrival-latency samples with a running mean.
//!
//! Recording needs `&mut self`, so a tracker shared between tasks has to sit
//! behind a mutex or be owned by a single task fed over a channel.

use std::collections::VecDeque;

/// Default number of retained samples
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// Result of recording one frame arrival
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySample {
    /// Receive time minus sender timestamp, in milliseconds (negative under clock skew)
    pub latency_ms: i64,

    /// Mean over every sample currently in the window, including this one
    pub mean_ms: f64,
}

/// FIFO window of latency samples
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: VecDeque<i64>,
    capacity: usize,
    sum: i128,
}

impl LatencyTracker {
    /// Create a tracker retaining at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0,
        }
    }

    /// Record a frame arrival
    ///
    /// # Arguments
    ///
    /// * `now_ms` - Local receive time in milliseconds
    /// * `frame_timestamp_ms` - Sender timestamp carried in the frame
    pub fn record(&mut self, now_ms: u64, frame_timestamp_ms: u32) -> LatencySample {
        let latency_ms = (now_ms as i64).wrapping_sub(frame_timestamp_ms as i64);
        let mean_ms = self.push(latency_ms);
        LatencySample { latency_ms, mean_ms }
    }

    /// Append a latency sample, evicting the oldest when full
    ///
    /// Returns the updated running mean.
    pub fn push(&mut self, latency_ms: i64) -> f64 {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.sum -= evicted as i128;
            }
        }

        self.samples.push_back(latency_ms);
        self.sum += latency_ms as i128;

        self.sum as f64 / self.samples.len() as f64
    }

    /// Running mean of the retained samples
    pub fn mean_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.sum as f64 / self.samples.len() as f64)
    }

    /// Jitter as the population standard deviation of the retained samples
    pub fn jitter_ms(&self) -> Option<f64> {
        let mean = self.mean_ms()?;
        let variance = self
            .samples
            .iter()
            .map(|&s| {
                let d = s as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.samples.len() as f64;

        Some(variance.sqrt())
    }

    /// Most recent sample
    pub fn last_ms(&self) -> Option<i64> {
        self.samples.back().copied()
    }

    /// Retained samples, oldest first
    pub fn samples(&self) -> impl Iterator<Item = i64> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
