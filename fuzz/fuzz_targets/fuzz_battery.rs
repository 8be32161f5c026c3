#![no_main]

use arbitrary::Arbitrary;
use bitforge::{BitSequence, RandomnessBattery};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    bytes: Vec<u8>,
    threshold: f64,
}

fuzz_target!(|input: FuzzInput| {
    let bits = BitSequence::from_bytes(&input.bytes);

    let battery = match RandomnessBattery::new(input.threshold) {
        Ok(battery) => battery,
        Err(_) => RandomnessBattery::default(),
    };

    let report = battery.run_all(&bits);
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.length, bits.len());

    // Short-circuit run is a prefix of the full run
    let short = battery.run(&bits);
    assert!(short.outcomes.len() <= 3);
    assert_eq!(short.outcomes[..], report.outcomes[..short.outcomes.len()]);

    if bits.len() >= 2 {
        let stats = battery.excursion_stats(&bits).unwrap();
        assert!(stats.cycles >= 1);
        assert!(stats.statistics.iter().all(|y| y.is_finite()));

        let freq = battery.frequency(&bits).unwrap();
        assert!(freq.statistic >= 0.0);
    }

    let _ = report.to_json();
});
