//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Turn order must be reproducible so battles can be replayed and audited.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted combatant id order.
//!
//! - **Wall clocks**: Ledger timestamps come from a logical clock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::fixtures::TestEngine;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps executed per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the engine was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one step, given its index
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use tactics_test_utils::determinism::verify_determinism;
/// use tactics_test_utils::fixtures::duel;
///
/// let result = verify_determinism(
///     3,
///     4,
///     || duel(12, 5),
///     |engine, _| {
///         engine.begin_round();
///         while let Some(slot) = engine.next_turn() {
///             engine.end_turn(slot.id).unwrap();
///         }
///     },
///     |engine| engine.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for index in 0..steps {
            step(&mut state, index);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Compare two engine runs step-by-step, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(step)` if they diverge after that step
/// (0 means the initial states already differ).
pub fn find_first_divergence<Setup, Step>(setup: Setup, steps: u64, step: Step) -> Option<u64>
where
    Setup: Fn() -> TestEngine,
    Step: Fn(&mut TestEngine, u64),
{
    let mut first = setup();
    let mut second = setup();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for index in 0..steps {
        step(&mut first, index);
        step(&mut second, index);

        if first.state_hash() != second.state_hash() {
            return Some(index + 1);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel, id};
    use tactics_core::prelude::{ChangeSource, Stat};

    #[test]
    fn test_identical_runs_match() {
        let result = verify_determinism(
            4,
            6,
            || duel(10, 6),
            |engine, index| {
                let delta = if index % 2 == 0 { 1 } else { -1 };
                let _ = engine.change_stat(
                    id(1),
                    Stat::Initiative,
                    delta,
                    ChangeSource::Environment,
                );
                engine.begin_round();
                while let Some(slot) = engine.next_turn() {
                    engine.end_turn(slot.id).unwrap();
                }
            },
            |engine| engine.state_hash(),
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_no_divergence() {
        let divergence = find_first_divergence(
            || duel(12, 5),
            5,
            |engine, _| {
                engine.begin_round();
            },
        );
        assert_eq!(divergence, None);
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, 2i32)), compute_hash(&(1u32, 2i32)));
    }
}
