//! Memory latency sweep
//!
//! Prints one `<size>,<random offset>,<sequential offset>` line per array size, offsets in
//! nanoseconds per access. Fatal errors are always printed to stderr; set `RUST_LOG=debug` to
//! also see the raw baseline and access times of every step.
use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use mem_latency_rs::clock::MonotonicClock;
use mem_latency_rs::sweep::{Sweep, SweepConfig, ZeroedHeap};

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(version, about = "Measure random and sequential memory access latency across array sizes", long_about = None)]
struct Cli {
    /// Largest array size to measure, in bytes (at least 100)
    max_size: u64,

    /// Growth factor between consecutive array sizes (greater than 1)
    factor: f64,

    /// Minimum number of timed iterations per measurement (greater than 0)
    repeat: u64,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match SweepConfig::new(cli.max_size, cli.factor, cli.repeat) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid input arguments: {e}");
            error!("Rejected arguments {cli:?}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sweep = Sweep::new(config, MonotonicClock::new(), ZeroedHeap);
    match sweep.run(io::stdout().lock()) {
        Ok(summary) => {
            if let Some(largest) = summary.largest_size {
                info!("Measured {} sizes, largest {largest} bytes", summary.steps);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            error!("Sweep aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
