use crate::measure::{measure_random_latency, measure_sequential_latency, opaque_zero};
use crate::mmap::MMappedMemory;
use crate::{Error, Result};
use std::io::Write;

/// First array size of every sweep, in bytes.
pub const INITIAL_SIZE: u64 = 100;
pub const WORD_SIZE: u64 = std::mem::size_of::<u64>() as u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepConfig {
    pub max_size: u64,
    pub factor: f64,
    pub repeat: u64,
    pub huge_pages: bool,
}

impl SweepConfig {
    pub fn new(max_size: u64, factor: f64, repeat: u64) -> Result<SweepConfig> {
        if max_size == 0 {
            return Err(Error::InvalidArgument("max_size must be positive".into()));
        }
        if !factor.is_finite() || factor <= 1.0 {
            return Err(Error::InvalidArgument(format!(
                "factor must be greater than 1, got {}",
                factor
            )));
        }
        if repeat == 0 {
            return Err(Error::InvalidArgument("repeat must be positive".into()));
        }
        Ok(SweepConfig {
            max_size,
            factor,
            repeat,
            huge_pages: false,
        })
    }

    pub fn sizes(&self) -> SizeSweep {
        SizeSweep {
            current: INITIAL_SIZE,
            max_size: self.max_size,
            factor: self.factor,
        }
    }
}

/// Geometric series of array sizes, `INITIAL_SIZE` up to (excluding) `max_size`,
/// each term rounded up.
#[derive(Debug, Clone)]
pub struct SizeSweep {
    current: u64,
    max_size: u64,
    factor: f64,
}

impl Iterator for SizeSweep {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.current >= self.max_size {
            return None;
        }
        let size = self.current;
        let next = (size as f64 * self.factor).ceil() as u64;
        self.current = next.max(size + 1);
        Some(size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySample {
    pub size: u64,
    pub random_ns: f64,
    pub sequential_ns: f64,
}

impl LatencySample {
    pub const CSV_HEADER: &'static str = "size,random_ns,sequential_ns";

    pub fn write_csv(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "{},{},{}", self.size, self.random_ns, self.sequential_ns)
    }
}

/// Measure a single array size. Returns `None` when the size holds no full word.
pub fn measure_size(size: u64, repeat: u64, huge_pages: bool) -> Result<Option<LatencySample>> {
    let words = (size / WORD_SIZE) as usize;
    if words == 0 {
        log::debug!("Skipping {} bytes: smaller than one word", size);
        return Ok(None);
    }
    let memory = MMappedMemory::try_new(words, huge_pages, |i| i as u64)
        .map_err(|source| Error::Allocation { size, source })?;
    let zero = opaque_zero();

    let random = measure_random_latency(repeat, memory.slice(), zero);
    let sequential = measure_sequential_latency(repeat, memory.slice(), zero);
    log::trace!("lfsr states {:#x} {:#x}", random.rnd, sequential.rnd);

    Ok(Some(LatencySample {
        size,
        random_ns: random.latency(),
        sequential_ns: sequential.latency(),
    }))
}

/// Run the whole sweep, handing every sample to `on_sample` as soon as it is measured.
pub fn run_sweep(
    config: &SweepConfig,
    mut on_sample: impl FnMut(&LatencySample) -> Result<()>,
) -> Result<usize> {
    let mut count = 0;
    for size in config.sizes() {
        if let Some(sample) = measure_size(size, config.repeat, config.huge_pages)? {
            log::info!(
                "{} bytes: random {:.3} ns, sequential {:.3} ns",
                sample.size,
                sample.random_ns,
                sample.sequential_ns
            );
            on_sample(&sample)?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_rounded_geometric_series() {
        let config = SweepConfig::new(1000, 1.5, 1).unwrap();
        let sizes: Vec<u64> = config.sizes().collect();
        assert_eq!(sizes, vec![100, 150, 225, 338, 507, 761]);
    }

    #[test]
    fn max_size_is_exclusive() {
        let config = SweepConfig::new(200, 2.0, 1).unwrap();
        assert_eq!(config.sizes().collect::<Vec<_>>(), vec![100]);
        let config = SweepConfig::new(100, 2.0, 1).unwrap();
        assert_eq!(config.sizes().count(), 0);
    }

    #[test]
    fn tiny_factor_still_progresses() {
        let config = SweepConfig::new(110, 1.000_001, 1).unwrap();
        assert_eq!(config.sizes().count(), 10);
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        assert!(matches!(
            SweepConfig::new(0, 2.0, 10),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            SweepConfig::new(1000, 1.0, 10),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            SweepConfig::new(1000, f64::NAN, 10),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            SweepConfig::new(1000, 2.0, 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn sub_word_sizes_are_skipped() {
        assert_eq!(measure_size(7, 10, false).unwrap(), None);
    }

    #[test]
    fn sweep_emits_one_row_per_size() {
        let config = SweepConfig::new(2000, 2.0, 100).unwrap();
        let mut out = Vec::new();
        let count = run_sweep(&config, |s| Ok(s.write_csv(&mut out)?)).unwrap();
        assert_eq!(count, 5);

        let text = String::from_utf8(out).unwrap();
        let sizes: Vec<&str> = text
            .lines()
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(sizes, vec!["100", "200", "400", "800", "1600"]);
        for line in text.lines() {
            assert_eq!(line.split(',').count(), 3);
        }
    }
}
