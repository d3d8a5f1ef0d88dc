//! Memory hierarchy latency probing.
//!
//! Reads a byte array of growing size in a pseudo-random full-cycle order and in a wrapping
//! sequential order, subtracting the cost of an identical loop without the read, to expose the
//! capacity and latency of each cache level.
pub mod access;
pub mod clock;
pub mod error;
pub mod measure;
pub mod permutation;
pub mod sweep;

pub use error::{AllocError, ConfigError, ParseModeError, SweepError};

/// Convert number of bytes to formatted string
pub fn format_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.2} GiB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes / KB)
    } else {
        format!("{:.2} B", bytes)
    }
}
