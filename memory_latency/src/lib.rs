#![deny(unsafe_op_in_unsafe_fn)]

//! Memory access latency measurement over a geometric sweep of array sizes.
//!
//! Every measured size yields one CSV row `size,random_ns,sequential_ns`, the
//! input format of `latency_plot`.

pub mod measure;
pub mod mmap;
pub mod sweep;

use thiserror::Error;

pub use sweep::{run_sweep, LatencySample, SweepConfig};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to allocate {size} bytes: {source}")]
    Allocation {
        size: u64,
        #[source]
        source: nix::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
