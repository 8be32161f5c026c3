//! Statistical randomness battery.
//!
//! Three independent tests over a finished [`BitSequence`]:
//!
//! - frequency (monobit): `|S_n| / sqrt(n)` with bits mapped to ±1
//! - runs: deviation of the transition count from `2nπ(1-π)`, where `π` is
//!   the plain fraction of ones
//! - extended random excursions: visits to states ±1..±9 of the closed
//!   cumulative-sum walk, compared against the number of cycles `L`
//!
//! The first two pass when the statistic is `<=` the threshold; the
//! excursions test needs every one of its 18 statistics to be strictly `<`.

use serde::{Deserialize, Serialize};

use crate::{BitSequence, Error};

/// Default critical value shared by all three tests.
pub const DEFAULT_THRESHOLD: f64 = 1.82138636;

/// Number of excursion states: -9..=-1 and 1..=9.
pub const EXCURSION_STATES: usize = 18;

/// Outcome of one test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Computed statistic (for excursions, the largest `Y_j`).
    pub statistic: f64,
    /// Whether the sequence passed at `threshold`.
    pub passed: bool,
    /// Critical value the statistic was compared against.
    pub threshold: f64,
}

/// The three tests, in the order the battery runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    /// Frequency (monobit) test.
    Frequency,
    /// Runs test.
    Runs,
    /// Extended random-excursions test.
    Excursions,
}

impl TestKind {
    /// All tests in battery order.
    pub const ALL: [TestKind; 3] = [TestKind::Frequency, TestKind::Runs, TestKind::Excursions];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Frequency => "frequency",
            TestKind::Runs => "runs",
            TestKind::Excursions => "random excursions",
        }
    }
}

/// Per-state detail of the random-excursions test.
///
/// Arrays are indexed by state: `j + 9` for `j < 0`, `j + 8` for `j > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionStats {
    /// Number of zeros in the closed walk after the starting point (`L`).
    pub cycles: u64,
    /// Visit count `θ_j` for each state.
    pub visits: [u64; EXCURSION_STATES],
    /// Statistic `Y_j` for each state.
    pub statistics: [f64; EXCURSION_STATES],
}

impl ExcursionStats {
    /// State `j` stored at `index`.
    pub fn state(index: usize) -> i32 {
        if index < 9 {
            index as i32 - 9
        } else {
            index as i32 - 8
        }
    }

    /// Array index of state `j`, or `None` for 0 and `|j| > 9`.
    pub fn index_of(state: i32) -> Option<usize> {
        match state {
            -9..=-1 => Some((state + 9) as usize),
            1..=9 => Some((state + 8) as usize),
            _ => None,
        }
    }

    /// Largest `Y_j` over all states.
    pub fn max_statistic(&self) -> f64 {
        self.statistics
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Result of one test inside a battery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Which test ran.
    pub kind: TestKind,
    /// The statistic and verdict, when the statistic was defined.
    pub result: Option<TestResult>,
    /// Why the test failed without a statistic.
    pub failure: Option<String>,
}

impl TestOutcome {
    /// Whether this test passed.
    pub fn passed(&self) -> bool {
        self.result.is_some_and(|r| r.passed)
    }
}

/// Outcomes of a battery run over one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReport {
    /// Sequence length in bits.
    pub length: usize,
    /// Threshold the battery ran with.
    pub threshold: f64,
    /// Outcomes in run order; a short-circuited run stops at the first failure.
    pub outcomes: Vec<TestOutcome>,
}

impl BatteryReport {
    /// Whether all three tests ran and passed.
    pub fn passed(&self) -> bool {
        self.outcomes.len() == TestKind::ALL.len() && self.outcomes.iter().all(TestOutcome::passed)
    }

    /// First failing test, if any.
    pub fn first_failure(&self) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| !o.passed())
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Battery of statistical tests sharing one significance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BatteryFields")]
pub struct RandomnessBattery {
    threshold: f64,
}

#[derive(Deserialize)]
struct BatteryFields {
    threshold: f64,
}

impl TryFrom<BatteryFields> for RandomnessBattery {
    type Error = Error;

    fn try_from(fields: BatteryFields) -> Result<Self, Error> {
        Self::new(fields.threshold)
    }
}

impl Default for RandomnessBattery {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl RandomnessBattery {
    /// Create with a custom threshold, which must be positive and finite.
    pub fn new(threshold: f64) -> Result<Self, Error> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "threshold must be positive and finite, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    /// Threshold in use.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Frequency (monobit) test.
    pub fn frequency(&self, bits: &BitSequence) -> Result<TestResult, Error> {
        let n = check_length(bits)?;
        let sum: i64 = bits
            .as_slice()
            .iter()
            .map(|&b| if b == 1 { 1i64 } else { -1 })
            .sum();
        let statistic = sum.unsigned_abs() as f64 / (n as f64).sqrt();

        Ok(TestResult {
            statistic,
            passed: statistic <= self.threshold,
            threshold: self.threshold,
        })
    }

    /// Runs test.
    ///
    /// An all-zero or all-one sequence has `π(1-π) = 0` and is reported as
    /// [`Error::DegenerateInput`].
    pub fn runs(&self, bits: &BitSequence) -> Result<TestResult, Error> {
        let n = check_length(bits)?;
        let ones = bits.count_ones();
        if ones == 0 || ones == n {
            return Err(Error::DegenerateInput(format!(
                "runs test undefined for a constant sequence ({} ones in {} bits)",
                ones, n
            )));
        }

        let n_f = n as f64;
        let pi = ones as f64 / n_f;
        let transitions = bits.as_slice().windows(2).filter(|w| w[0] != w[1]).count();
        let v_n = (transitions + 1) as f64;

        let expected = 2.0 * n_f * pi * (1.0 - pi);
        let statistic = (v_n - expected).abs() / (2.0 * (2.0 * n_f * pi * (1.0 - pi)).sqrt());

        Ok(TestResult {
            statistic,
            passed: statistic <= self.threshold,
            threshold: self.threshold,
        })
    }

    /// Extended random-excursions test.
    ///
    /// The reported statistic is the largest of the 18 `Y_j`; the test passes
    /// only if that maximum is strictly below the threshold.
    pub fn excursions(&self, bits: &BitSequence) -> Result<TestResult, Error> {
        let stats = self.excursion_stats(bits)?;
        let statistic = stats.max_statistic();

        Ok(TestResult {
            statistic,
            passed: stats.statistics.iter().all(|&y| y < self.threshold),
            threshold: self.threshold,
        })
    }

    /// Walk the cumulative sums and compute `L`, `θ_j` and `Y_j`.
    pub fn excursion_stats(&self, bits: &BitSequence) -> Result<ExcursionStats, Error> {
        check_length(bits)?;

        let mut position = 0i64;
        let mut cycles = 0u64;
        let mut visits = [0u64; EXCURSION_STATES];
        for &bit in bits.as_slice() {
            position += if bit == 1 { 1 } else { -1 };
            if position == 0 {
                cycles += 1;
            } else if let Some(index) = i32::try_from(position).ok().and_then(ExcursionStats::index_of) {
                visits[index] += 1;
            }
        }
        // Closing zero appended after the last step
        cycles += 1;

        excursion_statistics(cycles, visits)
    }

    /// Run the tests in order, stopping at the first failure.
    pub fn run(&self, bits: &BitSequence) -> BatteryReport {
        self.run_tests(bits, true)
    }

    /// Run all three tests regardless of earlier failures.
    pub fn run_all(&self, bits: &BitSequence) -> BatteryReport {
        self.run_tests(bits, false)
    }

    fn run_tests(&self, bits: &BitSequence, stop_on_failure: bool) -> BatteryReport {
        let mut outcomes = Vec::with_capacity(TestKind::ALL.len());

        for kind in TestKind::ALL {
            let outcome = match self.run_one(kind, bits) {
                Ok(result) => TestOutcome {
                    kind,
                    result: Some(result),
                    failure: None,
                },
                Err(err) => TestOutcome {
                    kind,
                    result: None,
                    failure: Some(err.to_string()),
                },
            };
            tracing::debug!(
                test = kind.name(),
                statistic = outcome.result.map(|r| r.statistic),
                passed = outcome.passed(),
                "randomness test finished"
            );

            let passed = outcome.passed();
            outcomes.push(outcome);
            if stop_on_failure && !passed {
                break;
            }
        }

        BatteryReport {
            length: bits.len(),
            threshold: self.threshold,
            outcomes,
        }
    }

    fn run_one(&self, kind: TestKind, bits: &BitSequence) -> Result<TestResult, Error> {
        match kind {
            TestKind::Frequency => self.frequency(bits),
            TestKind::Runs => self.runs(bits),
            TestKind::Excursions => self.excursions(bits),
        }
    }
}

fn check_length(bits: &BitSequence) -> Result<usize, Error> {
    let n = bits.len();
    if n < 2 {
        return Err(Error::InvalidParameter(format!(
            "randomness tests need at least 2 bits, got {}",
            n
        )));
    }
    Ok(n)
}

/// `Y_j = (θ_j - L) / sqrt(2L(4|j| - 2))` for every state.
fn excursion_statistics(
    cycles: u64,
    visits: [u64; EXCURSION_STATES],
) -> Result<ExcursionStats, Error> {
    if cycles == 0 {
        return Err(Error::DegenerateInput(
            "random walk never returns to zero".into(),
        ));
    }

    let l = cycles as f64;
    let mut statistics = [0.0f64; EXCURSION_STATES];
    for (index, y) in statistics.iter_mut().enumerate() {
        let j = f64::from(ExcursionStats::state(index).abs());
        *y = (visits[index] as f64 - l) / (2.0 * l * (4.0 * j - 2.0)).sqrt();
    }

    Ok(ExcursionStats {
        cycles,
        visits,
        statistics,
    })
}
