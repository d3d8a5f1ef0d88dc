//! # Sweep
//!
//! Walks array sizes geometrically from [`MIN_ARRAY_SIZE`] up to a configured maximum. Every step
//! allocates a fresh zeroed array, measures it with the random pattern and then the sequential
//! one, and writes one [`Record`] to the output sink. The array lives exactly as long as the
//! step that measures it.
use std::fmt;
use std::hint::black_box;
use std::io::Write;

use log::{debug, info};

use crate::clock::{Clock, OpaqueZero};
use crate::error::{AllocError, ConfigError, SweepError};
use crate::format_size;
use crate::measure::measure;
use crate::permutation::AccessMode;

/// Element type of the measured array
pub type ArrayElement = u8;

/// Size of one array element in bytes
pub const ELEMENT_SIZE: u64 = size_of::<ArrayElement>() as u64;

/// First (and smallest allowed maximum) array size, in bytes
pub const MIN_ARRAY_SIZE: u64 = 100;

/// Validated sweep parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepConfig {
    max_size: u64,
    factor: f64,
    repeat: u64,
}

impl SweepConfig {
    pub fn new(max_size: u64, factor: f64, repeat: u64) -> Result<Self, ConfigError> {
        if max_size < MIN_ARRAY_SIZE {
            return Err(ConfigError::MaxSizeTooSmall {
                value: max_size,
                min: MIN_ARRAY_SIZE,
            });
        }
        if !factor.is_finite() || factor <= 1.0 {
            return Err(ConfigError::InvalidFactor(factor));
        }
        if repeat == 0 {
            return Err(ConfigError::ZeroRepeat);
        }
        Ok(SweepConfig {
            max_size,
            factor,
            repeat,
        })
    }

    /// Array sizes the sweep measures, in increasing order
    pub fn sizes(&self) -> SweepSizes {
        SweepSizes {
            next: Some(MIN_ARRAY_SIZE),
            max_size: self.max_size,
            factor: self.factor,
        }
    }
}

/// Iterator over `100, floor(100 * f), floor(floor(100 * f) * f), ...` up to the maximum.
///
/// A step whose truncated product would not grow advances by one byte instead, so the sequence
/// is strictly increasing and always ends.
#[derive(Debug, Clone)]
pub struct SweepSizes {
    next: Option<u64>,
    max_size: u64,
    factor: f64,
}

impl Iterator for SweepSizes {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let size = self.next.filter(|&size| size <= self.max_size)?;
        self.next = grow(size, self.factor);
        Some(size)
    }
}

/// Size following `size`, or `None` once `u64` is exhausted
fn grow(size: u64, factor: f64) -> Option<u64> {
    // float-to-int casts saturate at u64::MAX
    let scaled = (size as f64 * factor) as u64;
    if scaled > size {
        Some(scaled)
    } else {
        size.checked_add(1)
    }
}

/// Source of zero-initialized arrays
pub trait ArrayAllocator {
    /// A zeroed array of `bytes` bytes, or an error if the memory cannot be obtained
    fn allocate(&self, bytes: u64) -> Result<Box<[ArrayElement]>, AllocError>;
}

/// Heap allocator that reports failure instead of aborting the process
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroedHeap;

impl ArrayAllocator for ZeroedHeap {
    fn allocate(&self, bytes: u64) -> Result<Box<[ArrayElement]>, AllocError> {
        let failed = AllocError { bytes };
        let len = usize::try_from(bytes / ELEMENT_SIZE).map_err(|_| failed)?;

        let mut array = Vec::new();
        array.try_reserve_exact(len).map_err(|_| failed)?;
        array.resize(len, 0);
        Ok(array.into_boxed_slice())
    }
}

/// Output of one sweep step. Displays as `<size>,<random offset>,<sequential offset>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub array_size_in_memory: u64,
    pub random_offset: f64,
    pub sequential_offset: f64,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:.2},{:.2}",
            self.array_size_in_memory, self.random_offset, self.sequential_offset
        )
    }
}

/// What a completed sweep covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepSummary {
    pub steps: u64,
    pub largest_size: Option<u64>,
}

/// Sweep driver bound to a clock and an array allocator
pub struct Sweep<C, A> {
    config: SweepConfig,
    clock: C,
    allocator: A,
    zero: OpaqueZero,
}

impl<C: Clock, A: ArrayAllocator> Sweep<C, A> {
    /// Create a driver, deriving its opaque zero from `clock`
    pub fn new(config: SweepConfig, clock: C, allocator: A) -> Self {
        let zero = OpaqueZero::derive(&clock);
        Sweep {
            config,
            clock,
            allocator,
            zero,
        }
    }

    /// Measure every size of the sweep, writing each record to `sink` as soon as it is known.
    ///
    /// An allocation or write failure stops the sweep; records already written stay written.
    pub fn run<W: Write>(&self, mut sink: W) -> Result<SweepSummary, SweepError> {
        info!(
            "Sweep starting: up to {} (factor {}, repeat {})",
            format_size(self.config.max_size),
            self.config.factor,
            self.config.repeat
        );

        let mut summary = SweepSummary::default();
        for size in self.config.sizes() {
            let record = self.measure_step(size)?;
            writeln!(sink, "{record}")?;
            sink.flush()?;
            summary.steps += 1;
            summary.largest_size = Some(size);
        }

        info!("Sweep finished after {} steps", summary.steps);
        Ok(summary)
    }

    /// Measure a single array size with both access patterns, random first
    pub fn measure_step(&self, array_size_in_memory: u64) -> Result<Record, AllocError> {
        let array = self.allocator.allocate(array_size_in_memory)?;

        let [random, sequential] = AccessMode::ALL
            .map(|mode| measure(&self.clock, self.config.repeat, &array, self.zero, mode));
        black_box((random.rnd, sequential.rnd));

        debug!(
            "{}: random {:.2}/{:.2} ns, sequential {:.2}/{:.2} ns (baseline/access)",
            format_size(array_size_in_memory),
            random.baseline,
            random.access_time,
            sequential.baseline,
            sequential.access_time
        );

        Ok(Record {
            array_size_in_memory,
            random_offset: random.offset(),
            sequential_offset: sequential.offset(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use std::cell::Cell;
    use std::io;

    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        fn now_nanos(&self) -> u64 {
            let now = self.0.get();
            self.0.set(now + 1_000);
            now
        }
    }

    /// Fails every request above `limit` bytes and counts what it hands out
    struct CappedHeap {
        limit: u64,
        served: Cell<u64>,
    }

    impl ArrayAllocator for CappedHeap {
        fn allocate(&self, bytes: u64) -> Result<Box<[u8]>, AllocError> {
            if bytes > self.limit {
                return Err(AllocError { bytes });
            }
            self.served.set(self.served.get() + 1);
            ZeroedHeap.allocate(bytes)
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sizes(max_size: u64, factor: f64) -> Vec<u64> {
        SweepConfig::new(max_size, factor, 1).unwrap().sizes().collect()
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            SweepConfig::new(50, 2.0, 10),
            Err(ConfigError::MaxSizeTooSmall { value: 50, min: 100 })
        );
        assert_eq!(SweepConfig::new(800, 1.0, 10), Err(ConfigError::InvalidFactor(1.0)));
        assert_eq!(SweepConfig::new(800, 0.5, 10), Err(ConfigError::InvalidFactor(0.5)));
        assert!(matches!(
            SweepConfig::new(800, f64::NAN, 10),
            Err(ConfigError::InvalidFactor(_))
        ));
        assert!(SweepConfig::new(800, f64::INFINITY, 10).is_err());
        assert_eq!(SweepConfig::new(800, 2.0, 0), Err(ConfigError::ZeroRepeat));
        assert!(SweepConfig::new(100, 1.01, 1).is_ok());
    }

    #[test]
    fn sizes_grow_geometrically() {
        assert_eq!(sizes(800, 2.0), [100, 200, 400, 800]);
        assert_eq!(sizes(799, 2.0), [100, 200, 400]);
        assert_eq!(sizes(1000, 1.5), [100, 150, 225, 337, 505, 757]);
        assert_eq!(sizes(100, 1.01), [100]);
    }

    #[test]
    fn sizes_always_increase() {
        assert_eq!(sizes(105, 1.001), [100, 101, 102, 103, 104, 105]);

        let all: Vec<u64> = sizes(u64::MAX, 2.0);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(all[0], 100);
        assert!(all.len() < 64);
    }

    #[test]
    fn zeroed_heap_allocates_zeroes() {
        let array = ZeroedHeap.allocate(4096).unwrap();
        assert_eq!(array.len(), 4096);
        assert!(array.iter().all(|&byte| byte == 0));

        assert_eq!(ZeroedHeap.allocate(u64::MAX), Err(AllocError { bytes: u64::MAX }));
    }

    #[test]
    fn record_format() {
        let record = Record {
            array_size_in_memory: 100,
            random_offset: 1.234,
            sequential_offset: -0.5,
        };
        assert_eq!(record.to_string(), "100,1.23,-0.50");
    }

    #[test]
    fn run_emits_one_record_per_size() {
        let config = SweepConfig::new(800, 2.0, 1000).unwrap();
        let sweep = Sweep::new(config, TickClock(Cell::new(0)), ZeroedHeap);
        let mut out = Vec::new();

        let summary = sweep.run(&mut out).unwrap();
        assert_eq!(summary.steps, 4);
        assert_eq!(summary.largest_size, Some(800));

        // every clock read is 1000ns apart, so baseline and access time cancel out
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["100,0.00,0.00", "200,0.00,0.00", "400,0.00,0.00", "800,0.00,0.00"]);
    }

    #[test]
    fn allocation_failure_keeps_earlier_records() {
        let config = SweepConfig::new(800, 2.0, 10).unwrap();
        let allocator = CappedHeap {
            limit: 200,
            served: Cell::new(0),
        };
        let sweep = Sweep::new(config, MonotonicClock::new(), allocator);
        let mut out = Vec::new();

        let err = sweep.run(&mut out).unwrap_err();
        assert!(matches!(err, SweepError::Alloc(AllocError { bytes: 400 })));
        assert_eq!(err.to_string(), "Failed to allocate memory of size 400 bytes");

        let text = String::from_utf8(out).unwrap();
        let sizes: Vec<&str> = text.lines().map(|l| l.split(',').next().unwrap()).collect();
        assert_eq!(sizes, ["100", "200"]);
        assert_eq!(sweep.allocator.served.get(), 2);
    }

    #[test]
    fn write_failure_stops_sweep() {
        let config = SweepConfig::new(800, 2.0, 10).unwrap();
        let sweep = Sweep::new(config, MonotonicClock::new(), ZeroedHeap);
        assert!(matches!(sweep.run(ClosedPipe), Err(SweepError::Output(_))));
    }

    #[test]
    fn measure_step_reports_offsets() {
        let config = SweepConfig::new(1000, 2.0, 5000).unwrap();
        let sweep = Sweep::new(config, MonotonicClock::new(), ZeroedHeap);
        let record = sweep.measure_step(1000).unwrap();
        assert_eq!(record.array_size_in_memory, 1000);
        assert!(record.random_offset.is_finite());
        assert!(record.sequential_offset.is_finite());
    }
}
