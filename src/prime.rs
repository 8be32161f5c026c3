//! Large probable-prime generation.
//!
//! Candidates are sampled uniformly with the top and bottom bits forced,
//! screened by trial division against the first eleven primes, then checked
//! with Miller-Rabin. The search is unbounded unless `max_attempts` is set.

use core::sync::atomic::{AtomicBool, Ordering};

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Primes used to cheaply reject candidates before Miller-Rabin.
const SMALL_PRIMES: [u32; 11] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31];

/// Probable-prime generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrimeGeneratorFields")]
pub struct PrimeGenerator {
    /// Independent Miller-Rabin rounds per candidate.
    trials: usize,
    /// Upper bound on sampled candidates; `None` searches until success.
    max_attempts: Option<u64>,
}

#[derive(Deserialize)]
struct PrimeGeneratorFields {
    trials: usize,
    #[serde(default)]
    max_attempts: Option<u64>,
}

impl TryFrom<PrimeGeneratorFields> for PrimeGenerator {
    type Error = Error;

    fn try_from(fields: PrimeGeneratorFields) -> Result<Self, Error> {
        let generator = Self::new(fields.trials)?;
        Ok(Self {
            max_attempts: fields.max_attempts,
            ..generator
        })
    }
}

impl Default for PrimeGenerator {
    fn default() -> Self {
        Self {
            trials: 5,
            max_attempts: None,
        }
    }
}

impl PrimeGenerator {
    /// Create with a custom number of Miller-Rabin rounds.
    pub fn new(trials: usize) -> Result<Self, Error> {
        if trials == 0 {
            return Err(Error::InvalidParameter(
                "Miller-Rabin needs at least one trial".into(),
            ));
        }
        Ok(Self {
            trials,
            max_attempts: None,
        })
    }

    /// Bound the number of candidates sampled per search.
    pub fn with_max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Miller-Rabin rounds per candidate.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Generate a probable prime with exactly `bits` bits.
    pub fn generate<R: Rng + ?Sized>(&self, bits: u64, rng: &mut R) -> Result<BigUint, Error> {
        self.search(bits, false, rng, None)
    }

    /// Generate a probable prime with exactly `bits` bits and `p ≡ 3 (mod 4)`.
    pub fn generate_blum<R: Rng + ?Sized>(&self, bits: u64, rng: &mut R) -> Result<BigUint, Error> {
        self.search(bits, true, rng, None)
    }

    /// Like [`generate`](Self::generate), returning [`Error::Cancelled`]
    /// once `cancel` is raised.
    pub fn generate_cancellable<R: Rng + ?Sized>(
        &self,
        bits: u64,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<BigUint, Error> {
        self.search(bits, false, rng, Some(cancel))
    }

    fn search<R: Rng + ?Sized>(
        &self,
        bits: u64,
        blum: bool,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<BigUint, Error> {
        if bits < 2 {
            return Err(Error::InvalidParameter(format!(
                "prime width must be at least 2 bits, got {}",
                bits
            )));
        }

        let top = BigUint::one() << (bits - 1);
        let low = if blum { BigUint::from(3u8) } else { BigUint::one() };
        let mut attempts = 0u64;

        loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled);
            }
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(Error::PrimeSearchExhausted { attempts });
                }
            }
            attempts += 1;

            let candidate = rng.gen_biguint(bits) | &top | &low;
            if has_small_factor(&candidate) {
                continue;
            }
            if self.is_probable_prime(&candidate, rng) {
                tracing::debug!(bits, attempts, blum, "prime found");
                return Ok(candidate);
            }
            tracing::trace!(bits, attempts, "candidate rejected by Miller-Rabin");
        }
    }

    /// Miller-Rabin test with this generator's number of random bases.
    ///
    /// Stops at the first witness of compositeness.
    pub fn is_probable_prime<R: Rng + ?Sized>(&self, n: &BigUint, rng: &mut R) -> bool {
        let one = BigUint::one();
        let two = BigUint::from(2u8);

        if *n == two || *n == BigUint::from(3u8) {
            return true;
        }
        if *n <= one || !n.bit(0) {
            return false;
        }

        let n_minus_one = n - &one;
        let mut t = n_minus_one.clone();
        let mut s = 0u64;
        while !t.bit(0) {
            t >>= 1;
            s += 1;
        }

        'bases: for _ in 0..self.trials {
            let a = rng.gen_biguint_range(&two, &n_minus_one);
            let mut x = a.modpow(&t, n);
            if x == one || x == n_minus_one {
                continue;
            }
            for _ in 1..s {
                x = x.modpow(&two, n);
                if x == n_minus_one {
                    continue 'bases;
                }
            }
            return false;
        }

        true
    }
}

/// Whether `n` is divisible by one of [`SMALL_PRIMES`] other than itself.
fn has_small_factor(n: &BigUint) -> bool {
    SMALL_PRIMES
        .iter()
        .any(|&p| (n % p).is_zero() && *n != BigUint::from(p))
}
