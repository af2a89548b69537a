use std::hint::black_box;
use std::time::Instant;

pub const GALOIS_POLYNOMIAL: u64 = (1 << 63) | (1 << 62) | (1 << 60) | (1 << 59);
const LFSR_SEED: u64 = 12345;

/// Advance a Galois LFSR by one step.
#[inline(always)]
pub fn lfsr_step(rnd: u64) -> u64 {
    (rnd >> 1) ^ (0u64.wrapping_sub(rnd & 1) & GALOIS_POLYNOMIAL)
}

/// A zero the optimizer cannot see through.
pub fn opaque_zero() -> u64 {
    black_box(0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Average time (ns) of one loop iteration without the memory access.
    pub baseline: f64,
    /// Average time (ns) of one loop iteration with the memory access.
    pub access_time: f64,
    /// Final LFSR state, returned so the loops cannot be elided.
    pub rnd: u64,
}

impl Measurement {
    /// Latency attributed to the memory access alone.
    pub fn latency(&self) -> f64 {
        self.access_time - self.baseline
    }
}

fn per_iteration(start: Instant, iterations: u64) -> f64 {
    start.elapsed().as_nanos() as f64 / iterations as f64
}

/// Shared body of both access patterns.
///
/// `next_index(i, rnd)` picks the element touched on iteration `i`; it must
/// return a value below `arr.len()`. The access loop folds each load into the
/// LFSR through `zero`, so every load depends on the previous one.
#[inline(always)]
fn measure(
    repeat: u64,
    arr: &[u64],
    zero: u64,
    next_index: impl Fn(u64, u64) -> u64,
) -> Measurement {
    assert!(!arr.is_empty(), "cannot measure an empty array");
    let len = arr.len() as u64;
    let repeat = repeat.max(len);

    let t0 = Instant::now();
    let mut rnd = LFSR_SEED;
    for i in 0..repeat {
        let index = next_index(i, rnd);
        rnd ^= index.wrapping_add(zero) & zero;
        rnd = lfsr_step(rnd);
    }
    let baseline = per_iteration(t0, repeat);

    let t1 = Instant::now();
    rnd = (rnd & zero) ^ LFSR_SEED;
    for i in 0..repeat {
        let index = next_index(i, rnd);
        rnd ^= arr[(index + zero) as usize] & zero;
        rnd = lfsr_step(rnd);
    }
    let access_time = per_iteration(t1, repeat);

    Measurement {
        baseline,
        access_time,
        rnd: black_box(rnd),
    }
}

/// Average latency of walking `arr` in order, `max(repeat, arr.len())` times.
pub fn measure_sequential_latency(repeat: u64, arr: &[u64], zero: u64) -> Measurement {
    let len = arr.len() as u64;
    measure(repeat, arr, zero, |i, _| i % len)
}

/// Average latency of a dependent pseudo-random walk over `arr`.
pub fn measure_random_latency(repeat: u64, arr: &[u64], zero: u64) -> Measurement {
    let len = arr.len() as u64;
    measure(repeat, arr, zero, |_, rnd| rnd % len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lfsr_shifts_even_states() {
        assert_eq!(lfsr_step(2), 1);
        assert_eq!(lfsr_step(0), 0);
    }

    #[test]
    fn lfsr_applies_polynomial_on_odd_states() {
        assert_eq!(lfsr_step(1), GALOIS_POLYNOMIAL);
        assert_eq!(lfsr_step(3), 1 ^ GALOIS_POLYNOMIAL);
    }

    #[test]
    fn lfsr_does_not_get_stuck() {
        let mut rnd = LFSR_SEED;
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            rnd = lfsr_step(rnd);
            assert_ne!(rnd, 0);
            seen.insert(rnd);
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn measurements_are_finite() {
        let arr: Vec<u64> = (0..512).collect();
        let zero = opaque_zero();
        for m in [
            measure_sequential_latency(1000, &arr, zero),
            measure_random_latency(1000, &arr, zero),
        ] {
            assert!(m.baseline.is_finite() && m.baseline >= 0.0);
            assert!(m.access_time.is_finite() && m.access_time >= 0.0);
            assert!(m.latency().is_finite());
        }
    }

    #[test]
    fn repeat_is_raised_to_array_length() {
        // A single requested iteration still walks the whole array without panicking.
        let arr = vec![7u64; 4096];
        let m = measure_sequential_latency(1, &arr, opaque_zero());
        assert!(m.access_time.is_finite());
    }
}
