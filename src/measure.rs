//! Measurement unit: a baseline pass and an access pass, each bracketed by clock reads
use crate::access::{access_pass, baseline_pass};
use crate::clock::{Clock, OpaqueZero};
use crate::permutation::{AccessMode, IndexPattern, Permutation, WrappingCounter};

/// Per-iteration cost of one measurement, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Loop overhead without the memory read
    pub baseline: f64,
    /// Loop overhead plus one memory read
    pub access_time: f64,
    /// Final traversal state, handed out so the loops stay observable
    pub rnd: u64,
}

impl Measurement {
    /// Estimated cost of the memory read alone
    pub fn offset(&self) -> f64 {
        self.access_time - self.baseline
    }
}

/// Measure `array` with the pattern `mode` selects.
///
/// `repeat` is raised to at least `array.len()` so a random walk covers the whole array.
///
/// # Panics
///
/// Panics if `array` is empty.
pub fn measure<C: Clock + ?Sized>(
    clock: &C,
    repeat: u64,
    array: &[u8],
    zero: OpaqueZero,
    mode: AccessMode,
) -> Measurement {
    match mode {
        AccessMode::Random => {
            let pattern = Permutation::new(array.len());
            measure_with(clock, &pattern, repeat, array, zero)
        }
        AccessMode::Sequential => {
            let pattern = WrappingCounter::new(array.len());
            measure_with(clock, &pattern, repeat, array, zero)
        }
    }
}

/// Measure `array` traversed by an arbitrary pattern
pub fn measure_with<C: Clock + ?Sized, P: IndexPattern>(
    clock: &C,
    pattern: &P,
    repeat: u64,
    array: &[u8],
    zero: OpaqueZero,
) -> Measurement {
    let repeat = repeat.max(array.len() as u64).max(1);

    let t0 = clock.now_nanos();
    let rnd = baseline_pass(pattern, repeat, pattern.seed(), zero);
    let t1 = clock.now_nanos();

    // back to the seed, without the optimizer knowing the baseline state is discarded
    let rnd = (rnd & zero.get()) ^ pattern.seed();

    let t2 = clock.now_nanos();
    let rnd = access_pass(pattern, array, repeat, rnd, zero);
    let t3 = clock.now_nanos();

    Measurement {
        baseline: per_iteration(t0, t1, repeat),
        access_time: per_iteration(t2, t3, repeat),
        rnd,
    }
}

fn per_iteration(start: u64, end: u64, repeat: u64) -> f64 {
    end.saturating_sub(start) as f64 / repeat as f64
}
