//! Timed access loops.
//!
//! Both passes run the same index arithmetic; only the access pass reads the array. Each pass
//! folds its per-iteration value into the traversal state through [`OpaqueZero`] and hands the
//! state back through `black_box`, so the loop cannot be proven dead or collapsed. The read is
//! volatile: exactly one load per iteration, never hoisted or vectorized.
use std::hint::black_box;
use std::ptr;

use crate::clock::OpaqueZero;
use crate::permutation::IndexPattern;

/// Loop overhead alone: `repeat` iterations of index computation without the read
#[inline(never)]
pub fn baseline_pass<P: IndexPattern>(
    pattern: &P,
    repeat: u64,
    mut rnd: u64,
    zero: OpaqueZero,
) -> u64 {
    let zero = zero.get();
    for _ in 0..repeat {
        let index = pattern.index(rnd);
        rnd ^= index as u64 & zero;
        rnd = pattern.advance(rnd);
    }
    black_box(rnd)
}

/// `repeat` iterations, each reading one byte of `array` at the pattern's next index
///
/// # Panics
///
/// Panics if the pattern does not cover exactly `array`.
#[inline(never)]
pub fn access_pass<P: IndexPattern>(
    pattern: &P,
    array: &[u8],
    repeat: u64,
    mut rnd: u64,
    zero: OpaqueZero,
) -> u64 {
    assert_eq!(pattern.len(), array.len(), "pattern length differs from array length");
    let base = array.as_ptr();
    let zero = zero.get();
    for _ in 0..repeat {
        let index = pattern.index(rnd);
        // SAFETY: `IndexPattern` guarantees index < pattern.len() == array.len()
        let value = unsafe { ptr::read_volatile(base.add(index)) };
        rnd ^= u64::from(value) & zero;
        rnd = pattern.advance(rnd);
    }
    black_box(rnd)
}
