//! Crate-wide settings document.
//!
//! [`Settings`] bundles the per-component configurations so callers can keep
//! one JSON document for the whole crate. Missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::{BlumBlumShub, Error, GeneratorKind, PrimeGenerator, RandomnessBattery, YarrowConfig};

/// Default width of each BBS factor, in bits.
pub const DEFAULT_BBS_PRIME_BITS: u64 = 160;

/// Configuration for generators and the randomness battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Battery threshold.
    pub battery: RandomnessBattery,
    /// Miller-Rabin rounds and search bound.
    pub primes: PrimeGenerator,
    /// Yarrow gate and reseed cadence.
    pub yarrow: YarrowConfig,
    /// Width of each BBS factor.
    pub bbs_prime_bits: u64,
    /// Generator used when the caller does not pick one.
    pub default_generator: GeneratorKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            battery: RandomnessBattery::default(),
            primes: PrimeGenerator::default(),
            yarrow: YarrowConfig::default(),
            bbs_prime_bits: DEFAULT_BBS_PRIME_BITS,
            default_generator: GeneratorKind::default(),
        }
    }
}

impl Settings {
    /// Set the battery threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, Error> {
        self.battery = RandomnessBattery::new(threshold)?;
        Ok(self)
    }

    /// Set the BBS factor width.
    pub fn with_bbs_prime_bits(mut self, bits: u64) -> Self {
        self.bbs_prime_bits = bits;
        self
    }

    /// Set the default generator.
    pub fn with_default_generator(mut self, kind: GeneratorKind) -> Self {
        self.default_generator = kind;
        self
    }

    /// Check every value a deserialized document may have left out of range.
    pub fn validate(&self) -> Result<(), Error> {
        RandomnessBattery::new(self.battery.threshold())?;
        PrimeGenerator::new(self.primes.trials())?;
        self.yarrow.validate()?;
        if self.bbs_prime_bits < BlumBlumShub::MIN_PRIME_BITS {
            return Err(Error::InvalidParameter(format!(
                "bbs_prime_bits must be at least {}, got {}",
                BlumBlumShub::MIN_PRIME_BITS,
                self.bbs_prime_bits
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| Error::InvalidParameter(format!("malformed settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
