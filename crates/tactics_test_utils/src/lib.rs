//! # Tactics Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Engine and roster fixtures
//! - A scripted turn-order provider with fault injection
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod provider;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
