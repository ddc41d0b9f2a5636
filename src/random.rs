//! Injectable random source for demo-mode discovery
//!
//! Finding generation is probability-driven, so the randomness is behind a
//! trait: production uses a seedable xorshift generator, tests script exact
//! sequences to force (or suppress) discoveries deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform random numbers in [0, 1).
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// xorshift64* generator behind a mutex so it can be shared across the
/// session and its classification threads.
pub struct XorShiftRandom {
    state: Mutex<u64>,
}

impl XorShiftRandom {
    /// Create a generator from an explicit seed (deterministic runs).
    pub fn seeded(seed: u64) -> Self {
        // xorshift state must be nonzero
        Self {
            state: Mutex::new(seed.max(1)),
        }
    }

    /// Create a generator seeded from the system clock.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E3779B97F4A7C15);
        Self::seeded(nanos)
    }
}

impl RandomSource for XorShiftRandom {
    fn next_f64(&self) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut x = *state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        *state = x;
        let bits = x.wrapping_mul(0x2545F4914F6CDD1D);
        // 53 high-quality bits mapped to [0, 1)
        (bits >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Scripted random source: yields the given values in order, then repeats
/// the fallback forever. Used by tests and deterministic demo drivers.
pub struct SequenceRandom {
    values: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>, fallback: f64) -> Self {
        Self {
            values: Mutex::new(values.into()),
            fallback,
        }
    }

    /// A source that never falls under any discovery threshold.
    pub fn never() -> Self {
        Self::new(Vec::new(), 1.0)
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.pop_front().unwrap_or(self.fallback)
    }
}

/// Short lowercase alphanumeric token for synthesized artifact names.
pub fn token(random: &dyn RandomSource, len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    (0..len)
        .map(|_| {
            let idx = (random.next_f64() * CHARSET.len() as f64) as usize;
            CHARSET[idx.min(CHARSET.len() - 1)] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generator_is_deterministic() {
        let a = XorShiftRandom::seeded(42);
        let b = XorShiftRandom::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn generator_stays_in_unit_interval() {
        let rng = XorShiftRandom::seeded(7);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn sequence_yields_values_then_fallback() {
        let rng = SequenceRandom::new(vec![0.05, 0.5], 1.0);
        assert_eq!(rng.next_f64(), 0.05);
        assert_eq!(rng.next_f64(), 0.5);
        assert_eq!(rng.next_f64(), 1.0);
        assert_eq!(rng.next_f64(), 1.0);
    }

    #[test]
    fn token_has_requested_length() {
        let rng = XorShiftRandom::seeded(1);
        let t = token(&rng, 6);
        assert_eq!(t.len(), 6);
        assert!(t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
