//! Drive Yarrow-160 from a custom entropy source.
//!
//! Run with: `cargo run --example custom_entropy`

use bitforge::{EntropySource, Error, RandomnessBattery, Yarrow160, YarrowConfig};
use sha2::{Digest, Sha256};

/// Toy source that hashes a running counter with the caller's inputs.
///
/// Predictable; for demonstration only.
struct CountingSource {
    count: u64,
}

impl EntropySource for CountingSource {
    fn sample(&mut self, inputs: &[u8]) -> Result<[u8; 32], Error> {
        self.count += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.count.to_be_bytes());
        hasher.update(inputs);
        Ok(hasher.finalize().into())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Gate every 4 blocks, reseed every 8
    let yarrow = Yarrow160::new(YarrowConfig::new(4, 8)?)?;
    let mut state = yarrow.new_state(CountingSource { count: 0 })?;

    let bits = yarrow.generate(20_000, &mut state)?;
    println!("Generated {} bits", bits.len());
    println!("  counter: {}", state.counter());
    println!("  gates:   {}", state.gates());
    println!("  reseeds: {}", state.reseeds());

    let report = RandomnessBattery::default().run(&bits);
    println!("Battery: {}", if report.passed() { "pass" } else { "FAIL" });

    Ok(())
}
