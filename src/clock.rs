//! Time source for measurements and the runtime zero used as an optimization barrier
use std::hint::black_box;
use std::time::Instant;

/// Nanosecond timestamps since an arbitrary epoch. Successive reads never decrease.
pub trait Clock {
    fn now_nanos(&self) -> u64;
}

/// Monotonic clock anchored at its construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> u64 {
        u64::try_from(self.anchor.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Timestamp above which the derived zero no longer depends on the clock value
const ZERO_THRESHOLD: u64 = 1_000_000_000;

/// A value that is always zero at runtime but unknown to the optimizer.
///
/// Masking with it keeps a value "used" without changing any result, so the compiler can
/// neither drop a loop whose output it feeds nor hoist the read it is combined with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueZero(u64);

impl OpaqueZero {
    /// Derive the zero from one clock read
    pub fn derive<C: Clock + ?Sized>(clock: &C) -> Self {
        let stamp = clock.now_nanos();
        // min(stamp, T) / (T + 1) == 0 for every stamp
        OpaqueZero(black_box(stamp.min(ZERO_THRESHOLD) / (ZERO_THRESHOLD + 1)))
    }

    #[inline(always)]
    pub fn get(self) -> u64 {
        self.0
    }
}
