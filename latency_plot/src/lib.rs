#![deny(unsafe_op_in_unsafe_fn)]

//! Plot memory latency benchmark results against array size, annotated with
//! the cache sizes of the machine and the page table eviction threshold.

pub mod config;
pub mod error;
pub mod measurements;
pub mod render;
pub mod thresholds;

pub use config::{OutputFormat, PlotConfig, Scale};
pub use error::{PlotError, Result};
pub use measurements::{Measurement, MeasurementTable};
pub use render::{render, ChartData, RenderOptions};
pub use thresholds::{compute_thresholds, CacheConstants, Thresholds};

use std::path::PathBuf;

/// Load, compute thresholds, render. Returns the path of the written chart.
pub fn plot(config: &PlotConfig) -> Result<PathBuf> {
    config.validate()?;
    let table = MeasurementTable::load(&config.input_path)?;
    let thresholds = compute_thresholds(&config.constants);
    log::debug!("{:?}", thresholds);
    let options = RenderOptions::from_config(config)?;
    render(&table, &thresholds, &options)?;
    Ok(options.output)
}
