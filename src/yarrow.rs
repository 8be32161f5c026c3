//! Yarrow-160 style generator with gated rekeying and entropy reseeding.
//!
//! Output blocks are `E_K(counter)` under a 32-byte key with a 128-bit
//! counter. Before each block two countdowns are checked:
//!
//! 1. generator gate (`Pg` blocks): the key is replaced by cipher output
//!    under the current key, so earlier blocks cannot be recomputed from
//!    the new key;
//! 2. reseed (`Pt` blocks): a fresh entropy sample is folded through a
//!    three-round SHA-256 chain seeded with the key, the new key is
//!    `HMAC-SHA256(K, chain)` and the counter advances by one.
//!
//! The configuration lives in [`Yarrow160`]; the mutable state lives in a
//! [`YarrowState`] handle that every call borrows mutably.

use aes::Aes256;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{BitGenerator, BitSequence, BlockCipher, EntropySource, Error};

type HmacSha256 = Hmac<Sha256>;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// Cipher block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// Hash-chain rounds folded into every reseed.
const RESEED_ROUNDS: u8 = 3;

/// Rekeying cadence for a Yarrow generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "YarrowConfigFields")]
pub struct YarrowConfig {
    /// Blocks between generator gates (`Pg`).
    pub generate_threshold: u32,
    /// Blocks between entropy reseeds (`Pt`).
    pub time_threshold: u32,
}

#[derive(Deserialize)]
struct YarrowConfigFields {
    generate_threshold: u32,
    time_threshold: u32,
}

impl TryFrom<YarrowConfigFields> for YarrowConfig {
    type Error = Error;

    fn try_from(fields: YarrowConfigFields) -> Result<Self, Error> {
        Self::new(fields.generate_threshold, fields.time_threshold)
    }
}

impl Default for YarrowConfig {
    fn default() -> Self {
        Self {
            generate_threshold: 10,
            time_threshold: 20,
        }
    }
}

impl YarrowConfig {
    /// Create with custom thresholds.
    pub fn new(generate_threshold: u32, time_threshold: u32) -> Result<Self, Error> {
        let config = Self {
            generate_threshold,
            time_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that both thresholds are positive.
    pub fn validate(&self) -> Result<(), Error> {
        if self.generate_threshold == 0 || self.time_threshold == 0 {
            return Err(Error::InvalidParameter(
                "Yarrow thresholds must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// AES-256 block primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256Cipher;

impl BlockCipher for Aes256Cipher {
    fn encrypt_block(&self, key: &[u8; KEY_LEN], block: &mut [u8; BLOCK_LEN]) {
        use aes::cipher::generic_array::GenericArray;
        use aes::cipher::{BlockEncrypt, KeyInit};

        let cipher = Aes256::new(GenericArray::from_slice(key));
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// Mutable Yarrow state: key, counter, entropy pool and countdowns.
///
/// Never persisted and never shared; every operation takes `&mut self`.
pub struct YarrowState {
    key: Zeroizing<[u8; KEY_LEN]>,
    counter: u128,
    pool: Box<dyn EntropySource + Send>,
    pg_remaining: u32,
    pt_remaining: u32,
    blocks_emitted: u64,
    gates: u64,
    reseeds: u64,
}

impl core::fmt::Debug for YarrowState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("YarrowState")
            .field("counter", &self.counter)
            .field("pg_remaining", &self.pg_remaining)
            .field("pt_remaining", &self.pt_remaining)
            .field("blocks_emitted", &self.blocks_emitted)
            .finish_non_exhaustive()
    }
}

impl YarrowState {
    /// Create a state with default thresholds, keyed from `entropy`.
    pub fn new<E: EntropySource + Send + 'static>(entropy: E) -> Result<Self, Error> {
        Yarrow160::default().new_state(entropy)
    }

    /// Current counter value.
    pub fn counter(&self) -> u128 {
        self.counter
    }

    /// Blocks left before the next generator gate.
    pub fn pg_remaining(&self) -> u32 {
        self.pg_remaining
    }

    /// Blocks left before the next reseed.
    pub fn pt_remaining(&self) -> u32 {
        self.pt_remaining
    }

    /// Output blocks produced so far.
    pub fn blocks_emitted(&self) -> u64 {
        self.blocks_emitted
    }

    /// Generator gates performed so far.
    pub fn gates(&self) -> u64 {
        self.gates
    }

    /// Entropy reseeds performed so far.
    pub fn reseeds(&self) -> u64 {
        self.reseeds
    }
}

/// Yarrow-160 generator configuration and cipher.
///
/// Holds no per-stream state, so one instance can drive any number of
/// [`YarrowState`] handles.
#[derive(Debug, Clone)]
pub struct Yarrow160<C = Aes256Cipher> {
    config: YarrowConfig,
    cipher: C,
}

impl Default for Yarrow160<Aes256Cipher> {
    fn default() -> Self {
        Self {
            config: YarrowConfig::default(),
            cipher: Aes256Cipher,
        }
    }
}

impl Yarrow160<Aes256Cipher> {
    /// Create an AES-256 based generator with the given thresholds.
    pub fn new(config: YarrowConfig) -> Result<Self, Error> {
        Self::with_cipher(config, Aes256Cipher)
    }
}

impl<C: BlockCipher> Yarrow160<C> {
    /// Create with a custom block cipher.
    pub fn with_cipher(config: YarrowConfig, cipher: C) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config, cipher })
    }

    /// Thresholds in use.
    pub fn config(&self) -> &YarrowConfig {
        &self.config
    }

    /// Create a state keyed from one entropy sample, counter at zero and
    /// both countdowns full.
    pub fn new_state<E: EntropySource + Send + 'static>(
        &self,
        mut entropy: E,
    ) -> Result<YarrowState, Error> {
        let key = Zeroizing::new(entropy.sample(b"bitforge/v1/yarrow/init")?);
        Ok(YarrowState {
            key,
            counter: 0,
            pool: Box::new(entropy),
            pg_remaining: self.config.generate_threshold,
            pt_remaining: self.config.time_threshold,
            blocks_emitted: 0,
            gates: 0,
            reseeds: 0,
        })
    }

    /// Borrow a state as a [`BitGenerator`].
    pub fn session<'a>(&'a self, state: &'a mut YarrowState) -> YarrowSession<'a, C> {
        YarrowSession {
            generator: self,
            state,
        }
    }

    /// Produce exactly `length` bits, advancing `state`.
    ///
    /// Blocks are unpacked MSB first; bits left over in the final block are
    /// dropped, and the next call starts from a fresh block.
    pub fn generate(&self, length: usize, state: &mut YarrowState) -> Result<BitSequence, Error> {
        if length == 0 {
            return Err(Error::InvalidParameter("length must be positive".into()));
        }

        let mut bits = Vec::with_capacity(length);
        while bits.len() < length {
            let block = self.next_block(state)?;
            'unpack: for byte in block.iter() {
                for shift in (0..8).rev() {
                    if bits.len() == length {
                        break 'unpack;
                    }
                    bits.push((byte >> shift) & 1);
                }
            }
        }

        Ok(BitSequence::from_trusted(bits))
    }

    /// Run the two cadence checks, then emit one block.
    fn next_block(&self, state: &mut YarrowState) -> Result<Zeroizing<[u8; BLOCK_LEN]>, Error> {
        if state.pg_remaining == 0 {
            self.gate(state);
            state.pg_remaining = self.config.generate_threshold;
        }
        if state.pt_remaining == 0 {
            self.reseed(state)?;
            state.pt_remaining = self.config.time_threshold;
        }

        let block = self.encrypt_counter(&state.key, state.counter);
        state.counter = state.counter.wrapping_add(1);
        state.pg_remaining -= 1;
        state.pt_remaining -= 1;
        state.blocks_emitted += 1;
        Ok(block)
    }

    fn encrypt_counter(&self, key: &[u8; KEY_LEN], counter: u128) -> Zeroizing<[u8; BLOCK_LEN]> {
        let mut block = Zeroizing::new(counter.to_be_bytes());
        self.cipher.encrypt_block(key, &mut block);
        block
    }

    /// Replace the key with `E_K(counter) || E_K(counter + 1)`.
    ///
    /// The counter itself is not advanced.
    fn gate(&self, state: &mut YarrowState) {
        let high = self.encrypt_counter(&state.key, state.counter);
        let low = self.encrypt_counter(&state.key, state.counter.wrapping_add(1));
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key[..BLOCK_LEN].copy_from_slice(&high[..]);
        key[BLOCK_LEN..].copy_from_slice(&low[..]);
        state.key = key;
        state.gates += 1;
        tracing::debug!(counter = %state.counter, gates = state.gates, "yarrow generator gate");
    }

    /// Fold fresh entropy into the key and advance the counter.
    fn reseed(&self, state: &mut YarrowState) -> Result<(), Error> {
        let sample = Zeroizing::new(state.pool.sample(&state.counter.to_be_bytes())?);

        let v0: Zeroizing<[u8; 32]> = Zeroizing::new(
            Sha256::new()
                .chain_update(&sample[..])
                .chain_update(&state.key[..])
                .finalize()
                .into(),
        );
        let mut v = v0.clone();
        for round in 1..=RESEED_ROUNDS {
            v = Zeroizing::new(
                Sha256::new()
                    .chain_update(&v[..])
                    .chain_update(&v0[..])
                    .chain_update([round])
                    .finalize()
                    .into(),
            );
        }

        let mut mac = HmacSha256::new_from_slice(&state.key[..])
            .expect("HMAC accepts any key size");
        mac.update(&v[..]);
        state.key = Zeroizing::new(mac.finalize().into_bytes().into());
        state.counter = state.counter.wrapping_add(1);
        state.reseeds += 1;
        tracing::debug!(counter = %state.counter, reseeds = state.reseeds, "yarrow reseed");
        Ok(())
    }
}

/// A [`Yarrow160`] bound to one mutably borrowed [`YarrowState`].
#[derive(Debug)]
pub struct YarrowSession<'a, C = Aes256Cipher> {
    generator: &'a Yarrow160<C>,
    state: &'a mut YarrowState,
}

impl<C: BlockCipher> BitGenerator for YarrowSession<'_, C> {
    fn generate(&mut self, length: usize) -> Result<BitSequence, Error> {
        self.generator.generate(length, &mut *self.state)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::SeededEntropy;

    fn seeded(seed: &[u8]) -> YarrowState {
        YarrowState::new(SeededEntropy::new(seed)).unwrap()
    }

    /// Source that serves `remaining` samples and then fails.
    struct Exhaustible {
        inner: SeededEntropy,
        remaining: usize,
    }

    impl EntropySource for Exhaustible {
        fn sample(&mut self, inputs: &[u8]) -> Result<[u8; 32], Error> {
            if self.remaining == 0 {
                return Err(Error::EntropyUnavailable("drained".into()));
            }
            self.remaining -= 1;
            self.inner.sample(inputs)
        }
    }

    #[test]
    fn test_aes256_known_answer() {
        // FIPS-197 appendix C.3
        let key: [u8; 32] = core::array::from_fn(|i| i as u8);
        let mut block: [u8; 16] = core::array::from_fn(|i| (i as u8) * 0x11);
        Aes256Cipher.encrypt_block(&key, &mut block);
        assert_eq!(
            block,
            [
                0x8e, 0xa2, 0xb7, 0xca, 0x51, 0x67, 0x45, 0xbf, 0xea, 0xfc, 0x49, 0x90, 0x4b, 0x49,
                0x60, 0x89
            ]
        );
    }

    #[test]
    fn test_initial_state() {
        let state = seeded(b"init");
        assert_eq!(state.counter(), 0);
        assert_eq!(state.pg_remaining(), 10);
        assert_eq!(state.pt_remaining(), 20);
    }

    #[test]
    fn test_exact_length_and_block_accounting() {
        let yarrow = Yarrow160::default();
        let mut state = seeded(b"len");
        let bits = yarrow.generate(300, &mut state).unwrap();
        assert_eq!(bits.len(), 300);
        // 300 bits need three 128-bit blocks
        assert_eq!(state.blocks_emitted(), 3);
        assert_eq!(state.counter(), 3);
        assert_eq!(state.pg_remaining(), 7);
        assert_eq!(state.pt_remaining(), 17);
    }

    #[test]
    fn test_cadence_over_25_blocks() {
        let yarrow = Yarrow160::default();
        let mut state = seeded(b"cadence");
        yarrow.generate(25 * 128, &mut state).unwrap();
        // gates before blocks 11 and 21, one reseed before block 21
        assert_eq!(state.gates(), 2);
        assert_eq!(state.reseeds(), 1);
        assert_eq!(state.blocks_emitted(), 25);
        assert_eq!(state.counter(), 26);
    }

    #[test]
    fn test_counter_strictly_increases() {
        let yarrow = Yarrow160::default();
        let mut state = seeded(b"mono");
        let mut last = state.counter();
        for _ in 0..60 {
            yarrow.generate(128, &mut state).unwrap();
            assert!(state.counter() > last);
            last = state.counter();
        }
    }

    #[test]
    fn test_blocks_never_repeat_across_calls() {
        let yarrow = Yarrow160::default();
        let mut state = seeded(b"unique");
        let mut seen = HashSet::new();
        for _ in 0..10 {
            let bytes = yarrow.generate(128 * 7, &mut state).unwrap().to_bytes();
            for block in bytes.chunks(BLOCK_LEN) {
                assert!(seen.insert(block.to_vec()), "block repeated");
            }
        }
        assert_eq!(seen.len(), 70);
    }

    #[test]
    fn test_trailing_bits_discarded() {
        let yarrow = Yarrow160::default();
        let mut split = seeded(b"tail");
        let mut whole = seeded(b"tail");

        let head = yarrow.generate(100, &mut split).unwrap();
        let next = yarrow.generate(28, &mut split).unwrap();
        let reference = yarrow.generate(256, &mut whole).unwrap();

        assert_eq!(head.as_slice(), &reference.as_slice()[..100]);
        assert_eq!(next.as_slice(), &reference.as_slice()[128..156]);
    }

    #[test]
    fn test_seeded_states_are_reproducible() {
        let yarrow = Yarrow160::default();
        let mut a = seeded(b"repro");
        let mut b = seeded(b"repro");
        // long enough to cross several gates and reseeds
        for _ in 0..5 {
            assert_eq!(
                yarrow.generate(1000, &mut a).unwrap(),
                yarrow.generate(1000, &mut b).unwrap()
            );
        }
        assert!(a.reseeds() > 0);
    }

    #[test]
    fn test_gate_changes_output_at_threshold() {
        let gated = Yarrow160::new(YarrowConfig::new(10, 1000).unwrap()).unwrap();
        let ungated = Yarrow160::new(YarrowConfig::new(1000, 1000).unwrap()).unwrap();
        let mut a = gated.new_state(SeededEntropy::new(b"gate")).unwrap();
        let mut b = ungated.new_state(SeededEntropy::new(b"gate")).unwrap();
        let x = gated.generate(11 * 128, &mut a).unwrap();
        let y = ungated.generate(11 * 128, &mut b).unwrap();
        assert_eq!(&x.as_slice()[..1280], &y.as_slice()[..1280]);
        assert_ne!(&x.as_slice()[1280..], &y.as_slice()[1280..]);
    }

    #[test]
    fn test_custom_thresholds_reset() {
        let yarrow = Yarrow160::new(YarrowConfig::new(2, 3).unwrap()).unwrap();
        let mut state = yarrow.new_state(SeededEntropy::new(b"small")).unwrap();
        yarrow.generate(128 * 4, &mut state).unwrap();
        // gate before block 3, reseed before block 4
        assert_eq!(state.gates(), 1);
        assert_eq!(state.reseeds(), 1);
        assert_eq!(state.pg_remaining(), 0);
        assert_eq!(state.pt_remaining(), 2);
    }

    #[test]
    fn test_zero_thresholds_rejected() {
        assert!(YarrowConfig::new(0, 5).is_err());
        assert!(YarrowConfig::new(5, 0).is_err());
        let bad = YarrowConfig {
            generate_threshold: 0,
            time_threshold: 1,
        };
        assert!(Yarrow160::new(bad).is_err());
    }

    #[test]
    fn test_deserialize_rejects_zero_thresholds() {
        let config: YarrowConfig =
            serde_json::from_str(r#"{"generate_threshold":4,"time_threshold":8}"#).unwrap();
        assert_eq!(config, YarrowConfig::new(4, 8).unwrap());
        assert!(serde_json::from_str::<YarrowConfig>(
            r#"{"generate_threshold":0,"time_threshold":8}"#
        )
        .is_err());
        assert!(serde_json::from_str::<YarrowConfig>(
            r#"{"generate_threshold":4,"time_threshold":0}"#
        )
        .is_err());
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut state = seeded(b"zero");
        assert!(matches!(
            Yarrow160::default().generate(0, &mut state),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(state.blocks_emitted(), 0);
    }

    #[test]
    fn test_reseed_failure_surfaces() {
        let yarrow = Yarrow160::new(YarrowConfig::new(10, 1).unwrap()).unwrap();
        let source = Exhaustible {
            inner: SeededEntropy::new(b"drain"),
            remaining: 1,
        };
        let mut state = yarrow.new_state(source).unwrap();
        let result = yarrow.generate(256, &mut state);
        assert!(matches!(result, Err(Error::EntropyUnavailable(_))));
    }

    #[test]
    fn test_session_is_bit_generator() {
        let yarrow = Yarrow160::default();
        let mut state = seeded(b"session");
        let mut session = yarrow.session(&mut state);
        assert_eq!(session.generate(64).unwrap().len(), 64);
        assert_eq!(state.counter(), 1);
    }

    #[test]
    fn test_debug_hides_key() {
        let text = format!("{:?}", seeded(b"dbg"));
        assert!(text.contains("counter"));
        assert!(!text.contains("key"));
    }
}
