//! # Tactics Core
//!
//! Deterministic combat turn-order engine for a turn-based tactical battle
//! simulator.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math (uses fixed-point percent tables)
//!
//! The engine composes each combatant's initiative from independent modifier
//! layers, decides who acts and in what order, and grants bonus actions to
//! combatants that vastly outpace the opposition. Everything outside the
//! core (the wider game's turn queue, battle log, persistence) is reached
//! through the [`provider::TurnOrderProvider`] trait.
//!
//! ## Crate Structure
//!
//! - [`engine`] - The [`TurnEngine`](engine::TurnEngine) facade
//! - [`combatant`] - Ids, typed capabilities and the roster arena
//! - [`stats`] - Stat names and the write-once baseline registry
//! - [`stages`] - Bounded stat stages
//! - [`ledger`] - Direct modifiers for stats without stages
//! - [`status`] - Status conditions and their penalties
//! - [`weather`] - Weather and the batched weather-ability boost
//! - [`double_turn`] - Double-turn qualification
//! - [`round`] - Turn counter and round queue
//! - [`config`] - Tunable rules
//! - [`math`] - Fixed-point percent math

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combatant;
pub mod config;
pub mod double_turn;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod math;
pub mod provider;
pub mod round;
pub mod stages;
pub mod stats;
pub mod status;
pub mod weather;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combatant::{
        Capability, CapabilitySet, ChangeSource, Combatant, CombatantId, Roster, SourceRelation,
        TeamId,
    };
    pub use crate::config::EngineConfig;
    pub use crate::engine::{StatChange, TurnEngine};
    pub use crate::error::{EngineError, RefusalKind, Result};
    pub use crate::ledger::LedgerEntry;
    pub use crate::math::{Fixed, Percent};
    pub use crate::provider::{
        InitiativeUpdate, NullProvider, TurnOrderProvider, UpdateReason, UpdateResult,
    };
    pub use crate::round::{SlotKind, TurnPhase, TurnSlot};
    pub use crate::stats::{BaselineStats, Stat};
    pub use crate::status::StatusCondition;
    pub use crate::weather::{BoostBatch, BoostOutcome, Weather, WeatherAbility};
}
