//! Run the randomness battery over all three generators.
//!
//! Run with: `RUST_LOG=debug cargo run --example battery_report`

use bitforge::{
    BitGenerator, BitSequence, BlumBlumShub, PrimeGenerator, QuadraticGenerator,
    RandomnessBattery, SystemEntropy, Yarrow160,
};
use tracing_subscriber::EnvFilter;

const LENGTH: usize = 10_000;

fn report(name: &str, battery: &RandomnessBattery, bits: &BitSequence) {
    let report = battery.run_all(bits);
    println!("{} ({} bits):", name, report.length);
    for outcome in &report.outcomes {
        match (&outcome.result, &outcome.failure) {
            (Some(result), _) => println!(
                "  {:<18} statistic {:.6}  {}",
                outcome.kind.name(),
                result.statistic,
                if result.passed { "pass" } else { "FAIL" }
            ),
            (None, Some(reason)) => println!("  {:<18} FAIL ({})", outcome.kind.name(), reason),
            (None, None) => {}
        }
    }
    println!("  overall: {}\n", if report.passed() { "pass" } else { "FAIL" });
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let battery = RandomnessBattery::default();
    println!("Threshold: {}\n", battery.threshold());

    let qcg = QuadraticGenerator::new(42).generate(LENGTH)?;
    report("Quadratic congruential", &battery, &qcg);

    let mut rng = rand::thread_rng();
    let mut bbs = BlumBlumShub::new(64, &PrimeGenerator::default(), &mut rng)?;
    let bbs_bits = bbs.generate(LENGTH)?;
    report("Blum-Blum-Shub (64-bit factors)", &battery, &bbs_bits);

    let yarrow = Yarrow160::default();
    let mut state = yarrow.new_state(SystemEntropy::default())?;
    let yarrow_bits = yarrow.generate(LENGTH, &mut state)?;
    report("Yarrow-160", &battery, &yarrow_bits);
    println!(
        "Yarrow handle: {} blocks, {} gates, {} reseeds",
        state.blocks_emitted(),
        state.gates(),
        state.reseeds()
    );

    let stats = battery.excursion_stats(&qcg)?;
    println!("\nQuadratic excursions: L = {}", stats.cycles);

    let constant = BitSequence::from_bits(vec![1; 200])?;
    report("All ones", &battery, &constant);

    println!("{}", battery.run(&qcg).to_json()?);
    Ok(())
}
