//! Bounded stat stages.
//!
//! Each stage-eligible stat carries an integer stage in `[-6, 6]`. A stage
//! maps to a multiplier through [`EngineConfig::stage_percent`], always
//! applied to the pristine baseline so repeated changes never compound.
//!
//! Boundary attempts are refused without mutation: `+1` at stage 6 reports
//! [`StageBoundary::AtMaximum`] and leaves the stage where it was.

use std::collections::BTreeMap;

use crate::combatant::CombatantId;
use crate::config::{EngineConfig, MAX_STAGE, MIN_STAGE};
use crate::math::scale_by_percent;
use crate::stats::Stat;

/// Why a stage change could not move the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageBoundary {
    /// Stage already at +6.
    AtMaximum,
    /// Stage already at -6.
    AtMinimum,
}

/// A successful stage move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStep {
    /// Stage before the change.
    pub old: i8,
    /// Stage after the change.
    pub new: i8,
}

impl StageStep {
    /// Stage delta that actually took effect after clamping.
    #[must_use]
    pub fn applied(self) -> i32 {
        i32::from(self.new) - i32::from(self.old)
    }
}

/// Stages of one combatant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageState {
    stages: BTreeMap<Stat, i8>,
}

impl Default for StageState {
    fn default() -> Self {
        Self::new()
    }
}

impl StageState {
    /// Every stage-eligible stat at 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Stat::STAGED.iter().map(|&stat| (stat, 0)).collect(),
        }
    }

    /// Current stage of a stat (0 for stats without stages).
    #[must_use]
    pub fn get(&self, stat: Stat) -> i8 {
        self.stages.get(&stat).copied().unwrap_or(0)
    }

    /// Move a stat's stage by `delta`, clamped to `[-6, 6]`.
    ///
    /// A clamped change of zero is refused and nothing is mutated.
    pub fn shift(&mut self, stat: Stat, delta: i32) -> Result<StageStep, StageBoundary> {
        let old = self.get(stat);
        let target = i32::from(old)
            .saturating_add(delta)
            .clamp(i32::from(MIN_STAGE), i32::from(MAX_STAGE));
        // Clamped to the i8 stage range above.
        let new = i8::try_from(target).unwrap_or(old);

        if new == old {
            return Err(if delta >= 0 {
                StageBoundary::AtMaximum
            } else {
                StageBoundary::AtMinimum
            });
        }

        self.stages.insert(stat, new);
        Ok(StageStep { old, new })
    }

    /// Put every stage back to 0.
    pub fn reset(&mut self) {
        for stage in self.stages.values_mut() {
            *stage = 0;
        }
    }

    /// Whether every stage is 0.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.stages.values().all(|&s| s == 0)
    }

    /// Iterate over `(stat, stage)` pairs in stat order.
    pub fn iter(&self) -> impl Iterator<Item = (Stat, i8)> + '_ {
        self.stages.iter().map(|(&stat, &stage)| (stat, stage))
    }
}

/// Stat value at a stage: `round(baseline × table[stage])`.
#[must_use]
pub fn staged_value(config: &EngineConfig, baseline: i32, stage: i8) -> i32 {
    scale_by_percent(baseline, config.stage_percent(stage))
}

/// Stage state of every combatant, created lazily on first interaction.
#[derive(Debug, Clone, Default)]
pub struct StageBook {
    states: BTreeMap<CombatantId, StageState>,
}

impl StageBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage state of a combatant, initialising it if unseen.
    pub fn entry(&mut self, id: CombatantId) -> &mut StageState {
        self.states.entry(id).or_default()
    }

    /// Stage of one stat, 0 if the combatant was never touched.
    #[must_use]
    pub fn stage(&self, id: CombatantId, stat: Stat) -> i8 {
        self.states.get(&id).map_or(0, |s| s.get(stat))
    }

    /// Stage state of a combatant, if initialised.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&StageState> {
        self.states.get(&id)
    }

    /// Reset every combatant's stages to 0, keeping the entries.
    pub fn reset_all(&mut self) {
        for state in self.states.values_mut() {
            state.reset();
        }
    }

    /// Drop a combatant's stages when it leaves.
    pub fn purge(&mut self, id: CombatantId) {
        self.states.remove(&id);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}
