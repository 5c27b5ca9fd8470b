use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::traits::host::TimeSource;

static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic millisecond wall clock, the graph's default time base.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> u64 {
        CLOCK_ORIGIN.elapsed().as_millis() as u64
    }
}

/// Estimates the skew between a sound-card clock and the wall clock.
///
/// The sound-card time is the sample count converted to milliseconds. The
/// first measurement pins the offset between the two clocks; later
/// measurements feed an exponential moving average of the difference.
pub struct ClockSynchronizer {
    wall: Arc<dyn TimeSource>,
    resolution_ms: u64,
    offset: Option<i64>,
    average_skew: f64,
}

impl ClockSynchronizer {
    const HISTORY_WEIGHT: f64 = 0.95;

    /// `resolution_ms` is the ticker interval; corrections are multiples of it.
    pub fn new(wall: Arc<dyn TimeSource>, resolution_ms: u64) -> Self {
        Self {
            wall,
            resolution_ms: resolution_ms.max(1),
            offset: None,
            average_skew: 0.0,
        }
    }

    /// Feeds an external (sound-card) time and returns the average skew in ms.
    ///
    /// Positive skew means the wall clock runs ahead of the sound card.
    pub fn set_external_time(&mut self, external_ms: u64) -> f64 {
        let wall = self.wall.now_ms() as i64;
        let external = external_ms as i64;
        let offset = *self.offset.get_or_insert(wall - external);
        let diff = wall - (external + offset);
        self.average_skew = self.average_skew * Self::HISTORY_WEIGHT
            + diff as f64 * (1.0 - Self::HISTORY_WEIGHT);
        self.average_skew
    }

    pub fn average_skew(&self) -> f64 {
        self.average_skew
    }

    /// Wall clock corrected by the skew, rounded down to the ticker resolution
    /// so statistical noise does not move the ticker.
    pub fn corrected_time(&self) -> u64 {
        let resolution = self.resolution_ms as i64;
        let rounded_skew = (self.average_skew as i64 / resolution) * resolution;
        (self.wall.now_ms() as i64 - rounded_skew).max(0) as u64
    }
}

/// Ticker time source backed by a shared synchronizer.
#[derive(Clone)]
pub struct SynchronizedClock {
    synchronizer: Arc<Mutex<ClockSynchronizer>>,
}

impl SynchronizedClock {
    pub fn new(synchronizer: Arc<Mutex<ClockSynchronizer>>) -> Self {
        Self { synchronizer }
    }
}

impl TimeSource for SynchronizedClock {
    fn now_ms(&self) -> u64 {
        self.synchronizer.lock().corrected_time()
    }
}
