//! Error types for the turn-order engine.
//!
//! Every refusal the engine can produce is a typed value. Nothing in this
//! crate is fatal: callers inspect [`EngineError::kind`] and decide whether a
//! message is worth surfacing to the player.

use thiserror::Error;

use crate::combatant::{Capability, CombatantId};
use crate::stats::Stat;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for all engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A stat name could not be normalised.
    #[error("Unknown stat: {0}")]
    UnknownStat(String),

    /// A stage increase was refused because the stage is already at +6.
    #[error("{stat} of combatant {combatant} won't go any higher")]
    AtMaximum {
        /// Combatant whose stat was targeted.
        combatant: CombatantId,
        /// Targeted stat.
        stat: Stat,
    },

    /// A stage decrease was refused because the stage is already at -6.
    #[error("{stat} of combatant {combatant} won't go any lower")]
    AtMinimum {
        /// Combatant whose stat was targeted.
        combatant: CombatantId,
        /// Targeted stat.
        stat: Stat,
    },

    /// A decrease was blocked by one of the combatant's capabilities.
    #[error("{capability} prevents lowering {stat} of combatant {combatant}")]
    PreventedByAbility {
        /// Combatant whose stat was targeted.
        combatant: CombatantId,
        /// Targeted stat.
        stat: Stat,
        /// Capability that blocked the change.
        capability: Capability,
    },

    /// A batch resolved with fewer successes than requested.
    #[error("Batch partially failed: {succeeded} of {requested} updates applied")]
    PartialBatchFailure {
        /// Number of updates submitted.
        requested: usize,
        /// Number of updates the provider reported as applied.
        succeeded: usize,
    },

    /// The combatant id is unknown or has left the battle.
    #[error("Combatant not found: {0}")]
    CombatantNotFound(CombatantId),

    /// A combatant with this id already joined the battle.
    #[error("Combatant already in battle: {0}")]
    DuplicateCombatant(CombatantId),

    /// A capability name could not be parsed.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// A weather name could not be parsed.
    #[error("Unknown weather: {0}")]
    UnknownWeather(String),

    /// Engine configuration failed to parse.
    #[error("Failed to parse engine config: {0}")]
    ConfigParse(String),
}

/// Coarse classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefusalKind {
    /// Bad input from the calling code.
    ProgrammerError,
    /// A valid refusal by the game rules.
    DomainRefusal,
    /// A valid refusal that can be attributed to a capability.
    AttributableRefusal,
    /// Partial failure; retried on the next eligible trigger.
    NonFatal,
    /// Reference to a combatant that no longer exists. Treated as a no-op.
    StaleReference,
}

impl EngineError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> RefusalKind {
        match self {
            Self::UnknownStat(_)
            | Self::DuplicateCombatant(_)
            | Self::UnknownCapability(_)
            | Self::UnknownWeather(_)
            | Self::ConfigParse(_) => RefusalKind::ProgrammerError,
            Self::AtMaximum { .. } | Self::AtMinimum { .. } => RefusalKind::DomainRefusal,
            Self::PreventedByAbility { .. } => RefusalKind::AttributableRefusal,
            Self::PartialBatchFailure { .. } => RefusalKind::NonFatal,
            Self::CombatantNotFound(_) => RefusalKind::StaleReference,
        }
    }

    /// Whether this error is a legitimate rules refusal rather than a bug.
    #[must_use]
    pub const fn is_refusal(&self) -> bool {
        matches!(
            self.kind(),
            RefusalKind::DomainRefusal | RefusalKind::AttributableRefusal
        )
    }
}
