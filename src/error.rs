//! Error types for a latency sweep

use thiserror::Error;

/// Rejected sweep parameters, detected before any measurement runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_size must be at least {min} bytes, got {value}")]
    MaxSizeTooSmall { value: u64, min: u64 },

    #[error("factor must be a finite number greater than 1, got {0}")]
    InvalidFactor(f64),

    #[error("repeat must be greater than 0")]
    ZeroRepeat,
}

/// The allocator could not provide a zeroed array of the requested size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to allocate memory of size {bytes} bytes")]
pub struct AllocError {
    pub bytes: u64,
}

/// Name that is not an access mode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown access mode '{0}' (expected 'random' or 'sequential')")]
pub struct ParseModeError(pub String);

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error("Failed to write measurement record: {0}")]
    Output(#[from] std::io::Error),
}
