use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Callback invoked by a session after every chunk.
pub type ProgressCallback = Box<dyn FnMut(&TransferProgress) + Send>;

/// Snapshot of a running transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    pub bytes_moved: u64,
    pub total_size: u64,
    /// Average speed over the recent window (0.0 until two samples exist).
    pub bytes_per_second: f64,
}

impl TransferProgress {
    /// Completion in percent, capped at 100.
    ///
    /// An empty source counts as complete.
    pub fn percent(&self) -> f64 {
        if self.total_size == 0 {
            return 100.0;
        }
        (self.bytes_moved as f64 / self.total_size as f64 * 100.0).min(100.0)
    }

    /// Estimated time to finish, if a speed is known.
    pub fn eta(&self) -> Option<Duration> {
        if self.bytes_per_second <= 0.0 {
            return None;
        }
        let remaining = self.total_size.saturating_sub(self.bytes_moved);
        Some(Duration::from_secs_f64(
            remaining as f64 / self.bytes_per_second,
        ))
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: u64,
    timestamp: Instant,
}

/// Calculates transfer speed using a sliding window of samples.
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

struct SpeedInner {
    samples: Vec<SpeedSample>,
    max_samples: usize,
    window_size: Duration,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SpeedCalculator {
    /// Creates a new calculator.
    ///
    /// - `window_size`: time window for speed calculation (default 5 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window_size: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: Vec::new(),
                max_samples: max_samples.unwrap_or(100),
                window_size: window_size.unwrap_or(Duration::from_secs(5)),
            }),
        }
    }

    /// Records a sample of `bytes` transferred at the current instant.
    pub fn add_sample(&self, bytes: u64) {
        let mut s = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        s.samples.push(SpeedSample {
            bytes,
            timestamp: now,
        });

        if let Some(cutoff) = now.checked_sub(s.window_size) {
            s.samples.retain(|sample| sample.timestamp >= cutoff);
        }

        if s.samples.len() > s.max_samples {
            let excess = s.samples.len() - s.max_samples;
            s.samples.drain(..excess);
        }
    }

    /// Returns the average speed in bytes/second within the window.
    ///
    /// Returns 0.0 if fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let (Some(first), Some(last)) = (s.samples.first(), s.samples.last()) else {
            return 0.0;
        };
        if s.samples.len() < 2 {
            return 0.0;
        }

        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }

        let total_bytes: u64 = s.samples.iter().map(|sample| sample.bytes).sum();
        total_bytes as f64 / elapsed.as_secs_f64()
    }

    /// Clears all recorded samples.
    pub fn reset(&self) {
        let mut s = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        s.samples.clear();
    }
}
