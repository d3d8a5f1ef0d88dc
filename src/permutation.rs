//! # Permutation
//!
//! Index generators that drive a timed traversal of an array. Each generator is a stateless
//! object: the traversal state is a plain `u64` threaded through [`IndexPattern::advance`], so the
//! measured loop keeps it in a register and can fold array contents into it.
//!
//! [`Permutation`] walks the cycle of a maximal-length Galois LFSR. Any `len` consecutive steps
//! from the seed visit every index of `[0, len)` exactly once, in an order with no stride a
//! hardware prefetcher could follow. [`WrappingCounter`] is the sequential counterpart: a counter
//! reduced modulo `len`.
use std::fmt;
use std::str::FromStr;

use crate::error::ParseModeError;

/// Fixed seed shared by every pattern, so runs are reproducible
pub const SEED: u64 = 12345;

/// Maximal-length feedback masks for right-shifting Galois LFSRs of width 2..=64, indexed by
/// `width - 2`. Bit `t - 1` is set for every tap `t` of the feedback polynomial.
const TAPS: [u64; 63] = [
    0x3,
    0x6,
    0xc,
    0x14,
    0x30,
    0x60,
    0xb8,
    0x110,
    0x240,
    0x500,
    0x829,
    0x100d,
    0x2015,
    0x6000,
    0xd008,
    0x12000,
    0x20400,
    0x40023,
    0x90000,
    0x140000,
    0x300000,
    0x420000,
    0xe10000,
    0x1200000,
    0x2000023,
    0x4000013,
    0x9000000,
    0x14000000,
    0x20000029,
    0x48000000,
    0x80200003,
    0x100080000,
    0x204000003,
    0x500000000,
    0x801000000,
    0x100000001f,
    0x2000000031,
    0x4400000000,
    0xa000140000,
    0x12000000000,
    0x300000c0000,
    0x63000000000,
    0xc0000030000,
    0x1b0000000000,
    0x300003000000,
    0x420000000000,
    0xc00000180000,
    0x1008000000000,
    0x3000000c00000,
    0x6000c00000000,
    0x9000000000000,
    0x18003000000000,
    0x30000000030000,
    0x40000040000000,
    0xc0000600000000,
    0x102000000000000,
    0x200004000000000,
    0x600003000000000,
    0xc00000000000000,
    0x1800300000000000,
    0x3000000000000030,
    0x6000000000000000,
    // x^64 + x^63 + x^61 + x^60 + 1
    (1 << 63) | (1 << 62) | (1 << 60) | (1 << 59),
];

/// Right-shifting Galois linear feedback shift register of a fixed width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaloisLfsr {
    width: u32,
    taps: u64,
}

impl GaloisLfsr {
    pub const MIN_WIDTH: u32 = 2;
    pub const MAX_WIDTH: u32 = 64;

    /// Register of `width` bits, or `None` outside `2..=64`
    pub fn new(width: u32) -> Option<Self> {
        if !(Self::MIN_WIDTH..=Self::MAX_WIDTH).contains(&width) {
            return None;
        }
        Some(GaloisLfsr {
            width,
            taps: TAPS[(width - Self::MIN_WIDTH) as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn taps(&self) -> u64 {
        self.taps
    }

    /// Number of states in the cycle: every nonzero value that fits in `width` bits
    pub fn period(&self) -> u64 {
        u64::MAX >> (u64::BITS - self.width)
    }

    /// Next register state. Nonzero states stay nonzero and within `width` bits.
    #[inline(always)]
    pub fn step(&self, state: u64) -> u64 {
        (state >> 1) ^ (0u64.wrapping_sub(state & 1) & self.taps)
    }
}

/// Maps a traversal state to array indices.
///
/// # Safety
///
/// `index` must return a value below `len()` for *every* `u64` state, not only for states
/// reachable from `seed()`. The timed access loop relies on this to read without bounds checks.
pub unsafe trait IndexPattern {
    /// Length of the array the pattern covers
    fn len(&self) -> usize;

    /// Starting state
    fn seed(&self) -> u64;

    /// Index addressed by `state`
    fn index(&self, state: u64) -> usize;

    /// State following `state`
    fn advance(&self, state: u64) -> u64;

    /// Endless index sequence starting from the seed
    fn indices(&self) -> Indices<'_, Self>
    where
        Self: Sized,
    {
        Indices {
            pattern: self,
            state: self.seed(),
        }
    }
}

/// Iterator over the indices an [`IndexPattern`] produces from its seed
pub struct Indices<'a, P> {
    pattern: &'a P,
    state: u64,
}

impl<P: IndexPattern> Iterator for Indices<'_, P> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.pattern.index(self.state);
        self.state = self.pattern.advance(self.state);
        Some(index)
    }
}

/// Pseudo-random full-cycle traversal of `[0, len)`.
///
/// Uses the narrowest LFSR whose period covers `len` and skips the states above `len`, so no
/// more than half the register states are ever skipped. State `s` addresses index `s - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutation {
    lfsr: GaloisLfsr,
    bound: u64,
    start: u64,
}

impl Permutation {
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "cannot permute an empty range");
        let bound = len as u64;
        let width = (u64::BITS - bound.leading_zeros()).max(GaloisLfsr::MIN_WIDTH);
        let lfsr = GaloisLfsr {
            width,
            taps: TAPS[(width - GaloisLfsr::MIN_WIDTH) as usize],
        };

        let mut permutation = Permutation {
            lfsr,
            bound,
            start: SEED % lfsr.period() + 1,
        };
        if permutation.start > bound {
            permutation.start = permutation.advance(permutation.start);
        }
        permutation
    }

    pub fn lfsr(&self) -> GaloisLfsr {
        self.lfsr
    }
}

unsafe impl IndexPattern for Permutation {
    fn len(&self) -> usize {
        self.bound as usize
    }

    fn seed(&self) -> u64 {
        self.start
    }

    #[inline(always)]
    fn index(&self, state: u64) -> usize {
        // identity for every state on the walk; the reduction keeps stray states in range
        (state.wrapping_sub(1) % self.bound) as usize
    }

    #[inline(always)]
    fn advance(&self, state: u64) -> u64 {
        let mut next = self.lfsr.step(state);
        while next > self.bound {
            next = self.lfsr.step(next);
        }
        next
    }
}

/// Sequential traversal: a counter reduced modulo `len`, wrapping around the array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappingCounter {
    bound: u64,
}

impl WrappingCounter {
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "cannot traverse an empty range");
        WrappingCounter { bound: len as u64 }
    }
}

unsafe impl IndexPattern for WrappingCounter {
    fn len(&self) -> usize {
        self.bound as usize
    }

    fn seed(&self) -> u64 {
        SEED
    }

    #[inline(always)]
    fn index(&self, state: u64) -> usize {
        (state % self.bound) as usize
    }

    #[inline(always)]
    fn advance(&self, state: u64) -> u64 {
        state.wrapping_add(1)
    }
}

/// Which pattern a measurement traverses the array with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Random,
    Sequential,
}

impl AccessMode {
    /// Modes in the order a sweep step measures them
    pub const ALL: [AccessMode; 2] = [AccessMode::Random, AccessMode::Sequential];
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Random => f.write_str("random"),
            AccessMode::Sequential => f.write_str("sequential"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(AccessMode::Random),
            "sequential" => Ok(AccessMode::Sequential),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}
