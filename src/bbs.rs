//! Blum-Blum-Shub generator.
//!
//! The modulus `n = p*q` is a product of two distinct primes congruent to
//! 3 mod 4. Starting from `x_0 = s^2 mod n` with `gcd(s, n) = 1`, each step
//! squares the state modulo `n` and emits its least significant bit.
//!
//! One modular squaring per bit makes this slow on realistic moduli; ask
//! for long streams in one call rather than bit by bit.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::Rng;

use crate::{BitGenerator, BitSequence, Error, PrimeGenerator};

/// Blum-Blum-Shub generator state.
///
/// The current state carries over between calls, so consecutive calls
/// continue one stream.
#[derive(Clone)]
pub struct BlumBlumShub {
    p: BigUint,
    q: BigUint,
    n: BigUint,
    state: BigUint,
}

impl fmt::Debug for BlumBlumShub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Factors and state would let anyone replay the stream.
        f.debug_struct("BlumBlumShub")
            .field("modulus_bits", &self.n.bits())
            .finish_non_exhaustive()
    }
}

impl BlumBlumShub {
    /// Smallest factor width that admits two distinct Blum primes.
    pub const MIN_PRIME_BITS: u64 = 5;

    /// Draw fresh factors of `prime_bits` bits and a random coprime seed.
    pub fn new<R: Rng + ?Sized>(
        prime_bits: u64,
        primes: &PrimeGenerator,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let (p, q) = draw_factors(prime_bits, primes, rng)?;
        let n = &p * &q;
        let seed = random_coprime(&n, rng);
        Ok(Self::assemble(p, q, n, &seed))
    }

    /// Draw fresh factors and start from the given seed.
    ///
    /// The seed is reduced modulo `n` and nudged upward until it is coprime
    /// with `n`, so any integer is accepted.
    pub fn with_seed<R: Rng + ?Sized>(
        prime_bits: u64,
        seed: &BigUint,
        primes: &PrimeGenerator,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let (p, q) = draw_factors(prime_bits, primes, rng)?;
        let n = &p * &q;
        let seed = coprime_seed(seed, &n);
        Ok(Self::assemble(p, q, n, &seed))
    }

    /// Build from known factors.
    ///
    /// Both factors must be distinct and congruent to 3 mod 4. Primality is
    /// the caller's responsibility.
    pub fn from_factors(p: BigUint, q: BigUint, seed: &BigUint) -> Result<Self, Error> {
        let three = BigUint::from(3u8);
        if p == q {
            return Err(Error::InvalidParameter("BBS factors must be distinct".into()));
        }
        for factor in [&p, &q] {
            if *factor < three || factor % 4u32 != three {
                return Err(Error::InvalidParameter(format!(
                    "BBS factor {} is not congruent to 3 mod 4",
                    factor
                )));
            }
        }
        let n = &p * &q;
        let seed = coprime_seed(seed, &n);
        Ok(Self::assemble(p, q, n, &seed))
    }

    fn assemble(p: BigUint, q: BigUint, n: BigUint, seed: &BigUint) -> Self {
        let state = (seed * seed) % &n;
        Self { p, q, n, state }
    }

    /// Restart the stream from a new seed over the same modulus.
    pub fn reseed(&mut self, seed: &BigUint) {
        let seed = coprime_seed(seed, &self.n);
        self.state = (&seed * &seed) % &self.n;
    }

    /// The modulus `n = p*q`.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// The two prime factors `(p, q)`.
    pub fn factors(&self) -> (&BigUint, &BigUint) {
        (&self.p, &self.q)
    }

    /// Like [`generate`](BitGenerator::generate), checking `cancel` before
    /// every squaring.
    ///
    /// On cancellation no bits are returned and the state keeps the
    /// squarings already performed.
    pub fn generate_cancellable(
        &mut self,
        length: usize,
        cancel: &AtomicBool,
    ) -> Result<BitSequence, Error> {
        self.run(length, Some(cancel))
    }

    fn run(&mut self, length: usize, cancel: Option<&AtomicBool>) -> Result<BitSequence, Error> {
        if length == 0 {
            return Err(Error::InvalidParameter("length must be positive".into()));
        }

        let mut bits = Vec::with_capacity(length);
        for _ in 0..length {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled);
            }
            self.state = (&self.state * &self.state) % &self.n;
            bits.push(u8::from(self.state.bit(0)));
        }

        Ok(BitSequence::from_trusted(bits))
    }
}

impl BitGenerator for BlumBlumShub {
    fn generate(&mut self, length: usize) -> Result<BitSequence, Error> {
        self.run(length, None)
    }
}

/// Draw two distinct Blum primes, resampling `q` until it differs from `p`.
fn draw_factors<R: Rng + ?Sized>(
    prime_bits: u64,
    primes: &PrimeGenerator,
    rng: &mut R,
) -> Result<(BigUint, BigUint), Error> {
    if prime_bits < BlumBlumShub::MIN_PRIME_BITS {
        return Err(Error::InvalidParameter(format!(
            "BBS factors need at least {} bits, got {}",
            BlumBlumShub::MIN_PRIME_BITS,
            prime_bits
        )));
    }

    let p = primes.generate_blum(prime_bits, rng)?;
    loop {
        let q = primes.generate_blum(prime_bits, rng)?;
        if q != p {
            return Ok((p, q));
        }
        tracing::debug!(prime_bits, "equal BBS factors drawn, resampling q");
    }
}

/// Uniform seed in `[2, n)` coprime with `n`.
fn random_coprime<R: Rng + ?Sized>(n: &BigUint, rng: &mut R) -> BigUint {
    let two = BigUint::from(2u8);
    loop {
        let s = rng.gen_biguint_range(&two, n);
        if s.gcd(n).is_one() {
            return s;
        }
        tracing::trace!("BBS seed shares a factor with the modulus, resampling");
    }
}

/// Reduce `seed` modulo `n`, then step upward to the first value `>= 2`
/// that is coprime with `n`.
fn coprime_seed(seed: &BigUint, n: &BigUint) -> BigUint {
    let two = BigUint::from(2u8);
    let mut s = seed % n;
    loop {
        if s < two {
            s = two.clone();
        }
        if s.gcd(n).is_one() {
            return s;
        }
        s += 1u32;
        if s >= *n {
            s = two.clone();
        }
    }
}
