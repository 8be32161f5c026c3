//! Quadratic congruential generator.
//!
//! `x_{k+1} = (a*x_k^2 + b*x_k + c) mod m` with fixed constants; each output
//! bit is the least significant bit of the next state. Not cryptographically
//! secure, but fully deterministic for a given seed.

use serde::{Deserialize, Serialize};

use crate::{BitGenerator, BitSequence, Error};

const A: u128 = 1_664_525;
const B: u128 = 1;
const C: u128 = 1_013_904_223;
const M: u128 = (1 << 32) - 1;

/// Quadratic congruential bit generator.
///
/// Holds only its seed: every call to [`generate`](BitGenerator::generate)
/// restarts the recurrence from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadraticGenerator {
    /// Initial state `x_0`.
    pub seed: i64,
}

impl Default for QuadraticGenerator {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl QuadraticGenerator {
    /// Create with the given seed.
    pub fn new(seed: i64) -> Self {
        Self { seed }
    }

    fn step(x: u128) -> u128 {
        (A * x * x + B * x + C) % M
    }
}

impl BitGenerator for QuadraticGenerator {
    fn generate(&mut self, length: usize) -> Result<BitSequence, Error> {
        if length == 0 {
            return Err(Error::InvalidParameter("length must be positive".into()));
        }

        // The recurrence is a polynomial mod m, so reducing the seed first
        // leaves every later state unchanged.
        let mut x = i128::from(self.seed).rem_euclid(M as i128) as u128;
        let mut bits = Vec::with_capacity(length);
        for _ in 0..length {
            x = Self::step(x);
            bits.push((x & 1) as u8);
        }

        Ok(BitSequence::from_trusted(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(seed: i64, length: usize) -> String {
        QuadraticGenerator::new(seed)
            .generate(length)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_known_stream_seed_42() {
        assert_eq!(bits_of(42, 32), "11010110010000010010000110101000");
    }

    #[test]
    fn test_known_stream_seed_0() {
        assert_eq!(bits_of(0, 32), "11111110111000110100111111111100");
    }

    #[test]
    fn test_negative_seed_matches_modular_reduction() {
        assert_eq!(bits_of(-5, 16), "1100111010000110");
    }

    #[test]
    fn test_seed_above_modulus() {
        let big = (1i64 << 40) + 7;
        let reduced = big % ((1i64 << 32) - 1);
        assert_eq!(bits_of(big, 16), "0111010010011101");
        assert_eq!(bits_of(big, 16), bits_of(reduced, 16));
    }

    #[test]
    fn test_repeated_calls_restart_from_seed() {
        let mut gen = QuadraticGenerator::default();
        let first = gen.generate(500).unwrap();
        let second = gen.generate(500).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_prefix_property() {
        let short = bits_of(99, 100);
        let long = bits_of(99, 1000);
        assert!(long.starts_with(&short));
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(
            QuadraticGenerator::new(1).generate(0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_state_never_exceeds_modulus() {
        let mut x = M - 1;
        for _ in 0..1000 {
            x = QuadraticGenerator::step(x);
            assert!(x < M);
        }
    }
}
