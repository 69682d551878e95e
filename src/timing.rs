// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Inference timing shared between the processing and display threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Bit pattern marking an empty slot (a NaN no duration can produce).
const EMPTY: u64 = u64::MAX;

/// Single-slot holder for the latest inference duration in milliseconds.
///
/// The pipeline writes, any number of display-side clones read. Only the most
/// recent value is kept.
#[derive(Debug, Clone)]
pub struct TimingSlot {
    bits: Arc<AtomicU64>,
}

impl Default for TimingSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(EMPTY)),
        }
    }

    /// Publish a new measurement.
    pub fn publish(&self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.bits.store(ms.to_bits(), Ordering::Release);
    }

    /// Latest measurement in milliseconds, if any frame was timed yet.
    #[must_use]
    pub fn latest_ms(&self) -> Option<f64> {
        match self.bits.load(Ordering::Acquire) {
            EMPTY => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    /// Display label for the latest measurement (`"0.00 ms"` before the first).
    #[must_use]
    pub fn label(&self) -> String {
        format_elapsed(self.latest_ms().unwrap_or(0.0))
    }
}

/// Wall-clock interval around resize and inference.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Start timing now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since [`Stopwatch::start`].
    #[must_use]
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

/// Format milliseconds as `"N.NN ms"`.
#[must_use]
pub fn format_elapsed(ms: f64) -> String {
    format!("{ms:.2} ms")
}
