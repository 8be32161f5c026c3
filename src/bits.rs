//! Bit sequences and MSB-first byte packing.
//!
//! Generators hand out [`BitSequence`] values; keystream consumers take the
//! packed bytes. Packing is 8 bits per byte, most significant bit first, with
//! any trailing bits beyond a whole byte discarded.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Immutable ordered sequence of bits, each stored as `0` or `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct BitSequence {
    bits: Vec<u8>,
}

impl BitSequence {
    /// Wrap raw bits, rejecting any value other than 0 or 1.
    pub fn from_bits(bits: Vec<u8>) -> Result<Self, Error> {
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(Error::InvalidParameter(format!(
                "bit at position {} is {}, expected 0 or 1",
                pos, bits[pos]
            )));
        }
        Ok(Self { bits })
    }

    /// Build from bits already known to be 0/1.
    pub(crate) fn from_trusted(bits: Vec<u8>) -> Self {
        debug_assert!(bits.iter().all(|&b| b <= 1));
        Self { bits }
    }

    /// Unpack bytes MSB-first into a sequence of `bytes.len() * 8` bits.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_trusted(unpack_bytes(bytes))
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the sequence holds no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bits as a slice of 0/1 values.
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    /// Number of one bits.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    /// Pack into bytes MSB-first, discarding trailing partial-byte bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        pack_bits(&self.bits)
    }

    /// Consume and return the raw bits.
    pub fn into_inner(self) -> Vec<u8> {
        self.bits
    }
}

impl TryFrom<Vec<u8>> for BitSequence {
    type Error = Error;

    fn try_from(bits: Vec<u8>) -> Result<Self, Error> {
        Self::from_bits(bits)
    }
}

impl From<BitSequence> for Vec<u8> {
    fn from(seq: BitSequence) -> Self {
        seq.bits
    }
}

impl AsRef<[u8]> for BitSequence {
    fn as_ref(&self) -> &[u8] {
        &self.bits
    }
}

impl fmt::Display for BitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit == 1 { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitSequence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let bits = s
            .trim()
            .chars()
            .enumerate()
            .map(|(pos, c)| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                other => Err(Error::InvalidParameter(format!(
                    "unexpected character {:?} at position {}",
                    other, pos
                ))),
            })
            .collect::<Result<Vec<u8>, Error>>()?;
        Ok(Self { bits })
    }
}

/// Pack bits into bytes, 8 per byte, most significant bit first.
///
/// Bits beyond the last whole byte are dropped.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | (bit & 1)))
        .collect()
}

/// Unpack bytes into bits, most significant bit first.
pub fn unpack_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}
