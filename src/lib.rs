//! Bitforge: pseudorandom bit generators and a statistical randomness battery.
//!
//! This crate produces deterministic-given-seed bit streams from three
//! generator families and certifies them with three statistical tests.
//!
//! # Architecture
//!
//! The crate is built around three capability traits:
//!
//! - [`BitGenerator`]: Produces a [`BitSequence`] of an exact length
//! - [`EntropySource`]: Supplies unpredictable bytes for rekeying
//! - [`BlockCipher`]: Encrypts one counter block for Yarrow output
//!
//! Three generators are provided:
//!
//! - [`QuadraticGenerator`]: quadratic congruential recurrence (not secure)
//! - [`BlumBlumShub`]: repeated squaring modulo a Blum semiprime
//! - [`Yarrow160`]: block cipher in counter mode with gated rekeying and
//!   entropy reseeding, driving an explicit [`YarrowState`] handle
//!
//! The [`RandomnessBattery`] runs the frequency, runs and random-excursions
//! tests over any finished sequence.
//!
//! # Example
//!
//! ```rust
//! use bitforge::{quadratic_generate, RandomnessBattery};
//!
//! let bits = quadratic_generate(10_000, 42).unwrap();
//! let report = RandomnessBattery::default().run(&bits);
//! assert!(report.passed());
//! ```
//!
//! # Concurrency
//!
//! [`PrimeGenerator`], [`QuadraticGenerator`] and [`RandomnessBattery`] are
//! plain values and may be shared freely. A [`YarrowState`] is only ever
//! advanced through `&mut`, so sequential use is enforced by the borrow
//! checker; share one across threads behind a mutex or give each caller its
//! own handle.

// Conditional unsafe code policy:
// - Without hardware feature: forbid all unsafe code
// - With hardware feature: allow controlled unsafe in entropy.rs for TSC/CNTVCT reads
#![cfg_attr(not(feature = "hardware"), forbid(unsafe_code))]

use num_bigint::BigUint;

pub mod battery;
pub mod bbs;
pub mod bits;
pub mod config;
pub mod entropy;
pub mod keystream;
pub mod prime;
pub mod quadratic;
pub mod traits;
pub mod yarrow;

// Re-exports
pub use battery::{BatteryReport, ExcursionStats, RandomnessBattery, TestKind, TestOutcome, TestResult};
pub use bbs::BlumBlumShub;
pub use bits::{pack_bits, unpack_bytes, BitSequence};
pub use config::Settings;
pub use entropy::{SeededEntropy, SystemEntropy};
pub use keystream::{
    derive_seed, keystream, keystream_default, keystream_with, GeneratorKind, KeystreamSeed,
};
pub use prime::PrimeGenerator;
pub use quadratic::QuadraticGenerator;
pub use traits::{BitGenerator, BlockCipher, EntropySource};
pub use yarrow::{Aes256Cipher, Yarrow160, YarrowConfig, YarrowSession, YarrowState};

/// Error types for bitforge operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A length, bit width, threshold or factor was out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input is valid but the statistic is undefined for it.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// A bounded prime search ran out of attempts.
    #[error("Prime search exhausted after {attempts} attempts")]
    PrimeSearchExhausted { attempts: u64 },

    /// A number-theoretic precondition failed (retried internally).
    #[error("Arithmetic domain error: {0}")]
    ArithmeticDomain(String),

    /// A cooperative cancellation flag was raised.
    #[error("Operation cancelled")]
    Cancelled,

    /// The entropy source could not produce fresh bytes.
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Generate `length` bits from the quadratic congruential recurrence.
pub fn quadratic_generate(length: usize, seed: i64) -> Result<BitSequence> {
    QuadraticGenerator::new(seed).generate(length)
}

/// Generate `length` bits from a fresh Blum-Blum-Shub instance whose two
/// factors each have `prime_bits` bits.
pub fn bbs_generate(length: usize, prime_bits: u64) -> Result<BitSequence> {
    if length == 0 {
        return Err(Error::InvalidParameter("length must be positive".into()));
    }
    let mut rng = rand::thread_rng();
    let mut bbs = BlumBlumShub::new(prime_bits, &PrimeGenerator::default(), &mut rng)?;
    bbs.generate(length)
}

/// Generate `length` bits from a Yarrow-160 handle with default thresholds,
/// carrying the handle's state forward.
pub fn yarrow_generate(length: usize, handle: &mut YarrowState) -> Result<BitSequence> {
    Yarrow160::default().generate(length, handle)
}

/// Generate a probable prime with exactly `bits` bits.
pub fn generate_large_prime(bits: u64) -> Result<BigUint> {
    PrimeGenerator::default().generate(bits, &mut rand::thread_rng())
}

/// Frequency (monobit) test at the default threshold.
pub fn frequency_test(bits: &BitSequence) -> Result<TestResult> {
    RandomnessBattery::default().frequency(bits)
}

/// Runs test at the default threshold.
pub fn runs_test(bits: &BitSequence) -> Result<TestResult> {
    RandomnessBattery::default().runs(bits)
}

/// Extended random-excursions test at the default threshold.
pub fn excursions_test(bits: &BitSequence) -> Result<TestResult> {
    RandomnessBattery::default().excursions(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_generate_is_repeatable() {
        let a = quadratic_generate(256, 7).unwrap();
        let b = quadratic_generate(256, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
    }

    #[test]
    fn test_generate_large_prime_bit_length() {
        let p = generate_large_prime(64).unwrap();
        assert_eq!(p.bits(), 64);
        assert!(p.bit(0));
    }

    #[test]
    fn test_generate_large_prime_rejects_tiny_width() {
        assert!(matches!(
            generate_large_prime(1),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_bbs_generate_length() {
        let bits = bbs_generate(300, 32).unwrap();
        assert_eq!(bits.len(), 300);
    }

    #[test]
    fn test_bbs_generate_rejects_zero_length_before_prime_search() {
        // 1 << 20 bit factors would take far too long to find
        assert!(matches!(
            bbs_generate(0, 1 << 20),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_yarrow_generate_advances_handle() {
        let mut handle = YarrowState::new(SeededEntropy::new(b"lib test")).unwrap();
        let first = yarrow_generate(128, &mut handle).unwrap();
        let second = yarrow_generate(128, &mut handle).unwrap();
        assert_ne!(first, second);
        assert_eq!(handle.counter(), 2);
    }

    #[test]
    fn test_free_battery_functions() {
        let bits = quadratic_generate(10_000, 42).unwrap();
        assert!(frequency_test(&bits).unwrap().passed);
        assert!(runs_test(&bits).unwrap().passed);
        assert!(excursions_test(&bits).unwrap().passed);
    }

    #[test]
    fn test_error_display() {
        let err = Error::PrimeSearchExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "Prime search exhausted after 3 attempts");
        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");
    }
}
