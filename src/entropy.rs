//! Entropy sources for Yarrow key material.
//!
//! [`SystemEntropy`] hashes timing jitter, wall-clock time, the process id
//! and operating-system randomness. [`SeededEntropy`] is a deterministic
//! HKDF expansion of a fixed seed, for reproducible keystreams and tests.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{EntropySource, Error};

/// Entropy gathered from the running system.
#[derive(Debug, Clone)]
pub struct SystemEntropy {
    /// Timing samples captured per call.
    pub timing_samples: usize,
}

impl Default for SystemEntropy {
    fn default() -> Self {
        Self { timing_samples: 64 }
    }
}

impl SystemEntropy {
    /// Create with a custom number of timing samples per call.
    pub fn new(timing_samples: usize) -> Self {
        Self { timing_samples }
    }
}

impl EntropySource for SystemEntropy {
    fn sample(&mut self, inputs: &[u8]) -> Result<[u8; 32], Error> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| Error::EntropyUnavailable(format!("system clock before epoch: {}", e)))?;

        let mut os_bytes = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng
            .try_fill_bytes(&mut os_bytes[..])
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(now.as_nanos().to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());

        // Only the spacing between consecutive reads is mixed in
        let start = std::time::Instant::now();
        let mut previous = cycle_count(start);
        for _ in 0..self.timing_samples {
            std::hint::spin_loop();
            let current = cycle_count(start);
            hasher.update(current.wrapping_sub(previous).to_le_bytes());
            previous = current;
        }

        hasher.update(&os_bytes[..]);
        hasher.update(inputs);

        Ok(hasher.finalize().into())
    }
}

/// Current cycle counter, read directly from the CPU.
#[cfg(all(feature = "hardware", target_arch = "x86_64"))]
fn cycle_count(_start: std::time::Instant) -> u64 {
    unsafe {
        core::arch::x86_64::_mm_lfence();
        core::arch::x86_64::_rdtsc()
    }
}

/// Current virtual counter, read directly from the CPU.
#[cfg(all(feature = "hardware", target_arch = "aarch64"))]
fn cycle_count(_start: std::time::Instant) -> u64 {
    let cntvct: u64;
    unsafe {
        core::arch::asm!("mrs {}, cntvct_el0", out(reg) cntvct);
    }
    cntvct
}

/// Nanoseconds since `start` from the monotonic clock.
#[cfg(not(all(feature = "hardware", any(target_arch = "x86_64", target_arch = "aarch64"))))]
fn cycle_count(start: std::time::Instant) -> u64 {
    start.elapsed().as_nanos() as u64
}

/// Deterministic entropy expanded from a fixed seed.
///
/// Sample `i` is `HKDF-Expand(PRK, "bitforge/v1/entropy" || i || inputs)`.
/// Two sources built from the same seed and fed the same inputs yield the
/// same samples.
#[derive(Clone)]
pub struct SeededEntropy {
    hk: Hkdf<Sha256>,
    counter: u64,
}

impl core::fmt::Debug for SeededEntropy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeededEntropy")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl SeededEntropy {
    /// Create from seed material of any length.
    pub fn new(seed: &[u8]) -> Self {
        Self {
            hk: Hkdf::<Sha256>::new(Some(&b"bitforge/v1/seeded-entropy"[..]), seed),
            counter: 0,
        }
    }

    /// Samples drawn so far.
    pub fn samples_drawn(&self) -> u64 {
        self.counter
    }
}

impl EntropySource for SeededEntropy {
    fn sample(&mut self, inputs: &[u8]) -> Result<[u8; 32], Error> {
        let mut info = Vec::with_capacity(27 + inputs.len());
        info.extend_from_slice(b"bitforge/v1/entropy");
        info.extend_from_slice(&self.counter.to_be_bytes());
        info.extend_from_slice(inputs);

        let mut output = [0u8; 32];
        self.hk
            .expand(&info, &mut output)
            .expect("32 bytes is a valid output length for HKDF-SHA256");
        self.counter += 1;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_entropy_collection() {
        let mut source = SystemEntropy::default();
        let a = source.sample(b"test").unwrap();
        let b = source.sample(b"test").unwrap();
        assert_ne!(a, b, "fresh samples should differ");
    }

    #[test]
    fn test_system_entropy_without_timing_samples() {
        let mut source = SystemEntropy::new(0);
        assert_ne!(source.sample(b"").unwrap(), [0u8; 32]);
    }

    #[test]
    fn test_cycle_count_is_monotonic() {
        let start = std::time::Instant::now();
        let first = cycle_count(start);
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(cycle_count(start) > first);
    }

    #[test]
    fn test_seeded_entropy_reproducible() {
        let mut a = SeededEntropy::new(b"seed");
        let mut b = SeededEntropy::new(b"seed");
        for _ in 0..4 {
            assert_eq!(a.sample(b"in").unwrap(), b.sample(b"in").unwrap());
        }
        assert_eq!(a.samples_drawn(), 4);
    }

    #[test]
    fn test_seeded_entropy_advances() {
        let mut source = SeededEntropy::new(b"seed");
        let first = source.sample(b"").unwrap();
        let second = source.sample(b"").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_seeded_entropy_mixes_inputs_and_seed() {
        let x = SeededEntropy::new(b"seed").sample(b"a").unwrap();
        let y = SeededEntropy::new(b"seed").sample(b"b").unwrap();
        let z = SeededEntropy::new(b"other").sample(b"a").unwrap();
        assert_ne!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn test_boxed_source() {
        let mut boxed: Box<dyn EntropySource + Send> = Box::new(SeededEntropy::new(b"s"));
        let mut plain = SeededEntropy::new(b"s");
        assert_eq!(boxed.sample(b"").unwrap(), plain.sample(b"").unwrap());
    }
}
