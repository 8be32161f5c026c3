//! Keystream derivation for external ciphers.
//!
//! A password and key material are hashed into a [`KeystreamSeed`], which
//! drives one of the generators; the resulting bits are packed MSB first.
//! The same password, key material and generator always give the same
//! keystream.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    BitGenerator, BitSequence, BlumBlumShub, Error, QuadraticGenerator, SeededEntropy, Settings,
    Yarrow160,
};

/// Generator family selected for a keystream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeneratorKind {
    /// Quadratic congruential generator (not secure).
    Quadratic,
    /// Blum-Blum-Shub.
    Bbs,
    /// Yarrow-160 over AES-256.
    #[default]
    Yarrow160,
}

/// Seed material derived from a password.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeystreamSeed {
    /// First four digest bytes, big-endian.
    pub seed_int: u32,
    /// The full SHA-256 digest.
    pub seed_bytes: [u8; 32],
}

impl core::fmt::Debug for KeystreamSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeystreamSeed").finish_non_exhaustive()
    }
}

/// `SHA-256(password || key_material)`, split into an integer seed and a
/// byte seed.
pub fn derive_seed(password: &[u8], key_material: &[u8]) -> KeystreamSeed {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(key_material);
    let seed_bytes: [u8; 32] = hasher.finalize().into();
    let seed_int = u32::from_be_bytes([seed_bytes[0], seed_bytes[1], seed_bytes[2], seed_bytes[3]]);

    KeystreamSeed {
        seed_int,
        seed_bytes,
    }
}

/// Produce `length_bytes` keystream bytes with default settings.
pub fn keystream(
    length_bytes: usize,
    kind: GeneratorKind,
    seed: &KeystreamSeed,
) -> Result<Vec<u8>, Error> {
    keystream_with(length_bytes, kind, seed, &Settings::default())
}

/// Produce `length_bytes` keystream bytes, taking BBS width, prime-search
/// and Yarrow cadence from `settings`.
pub fn keystream_with(
    length_bytes: usize,
    kind: GeneratorKind,
    seed: &KeystreamSeed,
    settings: &Settings,
) -> Result<Vec<u8>, Error> {
    settings.validate()?;
    let length = length_bytes
        .checked_mul(8)
        .ok_or_else(|| Error::InvalidParameter("keystream length overflows".into()))?;

    let bits = keystream_bits(length, kind, seed, settings)?;
    tracing::debug!(?kind, length_bytes, "keystream generated");
    Ok(bits.to_bytes())
}

/// Produce `length_bytes` keystream bytes with the generator named by
/// `settings.default_generator`.
pub fn keystream_default(
    length_bytes: usize,
    seed: &KeystreamSeed,
    settings: &Settings,
) -> Result<Vec<u8>, Error> {
    keystream_with(length_bytes, settings.default_generator, seed, settings)
}

fn keystream_bits(
    length: usize,
    kind: GeneratorKind,
    seed: &KeystreamSeed,
    settings: &Settings,
) -> Result<BitSequence, Error> {
    match kind {
        GeneratorKind::Quadratic => QuadraticGenerator::new(i64::from(seed.seed_int)).generate(length),
        GeneratorKind::Bbs => {
            let mut rng = ChaCha20Rng::from_seed(seed.seed_bytes);
            let mut bbs = BlumBlumShub::new(settings.bbs_prime_bits, &settings.primes, &mut rng)?;
            bbs.generate(length)
        }
        GeneratorKind::Yarrow160 => {
            let yarrow = Yarrow160::new(settings.yarrow)?;
            let mut state = yarrow.new_state(SeededEntropy::new(&seed.seed_bytes))?;
            yarrow.generate(length, &mut state)
        }
    }
}
