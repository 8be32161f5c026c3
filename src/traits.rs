//! Core traits for bit generators, entropy sources and block primitives.

use crate::{BitSequence, Error};

/// Generator producing bit sequences of an exact, requested length.
pub trait BitGenerator {
    /// Produce exactly `length` bits. `length == 0` is rejected.
    fn generate(&mut self, length: usize) -> Result<BitSequence, Error>;
}

/// Source of unpredictable bytes used to refresh generator key material.
pub trait EntropySource {
    /// Collect a fresh 32-byte sample, mixing in the provided inputs.
    fn sample(&mut self, inputs: &[u8]) -> Result<[u8; 32], Error>;
}

/// Block cipher used by Yarrow to encrypt its counter.
pub trait BlockCipher {
    /// Encrypt one 16-byte block in place under a 32-byte key.
    fn encrypt_block(&self, key: &[u8; 32], block: &mut [u8; 16]);
}

impl<E: EntropySource + ?Sized> EntropySource for Box<E> {
    fn sample(&mut self, inputs: &[u8]) -> Result<[u8; 32], Error> {
        (**self).sample(inputs)
    }
}
