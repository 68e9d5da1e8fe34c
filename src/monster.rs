use crate::battle::state::TurnRng;
use crate::battle::stats;
use crate::content::MoveId;
use crate::store::PlayerId;
use schema::{BaseStats, Growth, SpeciesId, Stat, StatBlock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use strum::IntoEnumIterator;

pub const MAX_MOVE_SLOTS: usize = 4;

/// Learn-list percentages never exceed this.
pub const MAX_LEARN_PERCENT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonsterId(pub u64);

/// Whether a learnable code names an effect or a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitKind {
    Effect,
    Bonus,
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitKind::Effect => write!(f, "effect"),
            TraitKind::Bonus => write!(f, "bonus"),
        }
    }
}

/// A monster's equipped reference to a canonical move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSlot {
    pub move_id: MoveId,
    pub current_pp: u8,
    pub name_custom: Option<String>,
}

impl MoveSlot {
    pub fn new(move_id: MoveId, max_pp: u8) -> Self {
        Self {
            move_id,
            current_pp: max_pp,
            name_custom: None,
        }
    }

    /// Spend one PP. Returns false when the slot was already empty.
    pub fn use_pp(&mut self) -> bool {
        if self.current_pp > 0 {
            self.current_pp -= 1;
            true
        } else {
            false
        }
    }

    /// Lower PP to `max_pp` if it is above it. PP never rises here.
    pub fn clamp_pp(&mut self, max_pp: u8) {
        self.current_pp = self.current_pp.min(max_pp);
    }
}

/// Codes a monster has permanently learned. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LearnedPool {
    pub effects: BTreeSet<String>,
    pub bonuses: BTreeSet<String>,
}

impl LearnedPool {
    pub fn contains(&self, kind: TraitKind, code: &str) -> bool {
        match kind {
            TraitKind::Effect => self.effects.contains(code),
            TraitKind::Bonus => self.bonuses.contains(code),
        }
    }

    pub fn insert(&mut self, kind: TraitKind, code: String) -> bool {
        match kind {
            TraitKind::Effect => self.effects.insert(code),
            TraitKind::Bonus => self.bonuses.insert(code),
        }
    }
}

/// Provisional percent chances (0-100) that a code becomes learned on level-up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LearnList {
    pub effects: BTreeMap<String, u8>,
    pub bonuses: BTreeMap<String, u8>,
}

impl LearnList {
    pub fn entries_mut(&mut self, kind: TraitKind) -> &mut BTreeMap<String, u8> {
        match kind {
            TraitKind::Effect => &mut self.effects,
            TraitKind::Bonus => &mut self.bonuses,
        }
    }

    /// Add one percentage point per distinct code, capped at 100.
    /// Codes already in `pool` are skipped.
    pub fn record<'a>(
        &mut self,
        kind: TraitKind,
        codes: impl IntoIterator<Item = &'a str>,
        pool: &LearnedPool,
    ) {
        let distinct: BTreeSet<&str> = codes.into_iter().collect();
        let entries = self.entries_mut(kind);
        for code in distinct {
            if pool.contains(kind, code) {
                continue;
            }
            let percent = entries.entry(code.to_string()).or_insert(0);
            *percent = percent.saturating_add(1).min(MAX_LEARN_PERCENT);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.bonuses.is_empty()
    }
}

/// A player-owned monster as persisted by the party store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub id: MonsterId,
    pub owner: PlayerId,
    pub species_id: SpeciesId,
    pub nickname: Option<String>,
    pub level: u32,
    pub xp: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub growth: Growth,
    pub moves: Vec<MoveSlot>,
    pub learned_pool: LearnedPool,
    pub learn_list: LearnList,
}

impl Monster {
    pub fn is_fainted(&self) -> bool {
        self.hp == 0
    }

    /// Derived max HP for the monster's current level and growth.
    pub fn derived_max_hp(&self, base: &BaseStats) -> u32 {
        stats::derive(base, &self.growth, self.level).hp
    }
}

/// Roll a fresh growth set: ±10% for primary stats, ±5% for ACC/EVA.
pub fn roll_growth(rng: &mut TurnRng) -> Growth {
    let mut growth = StatBlock::splat(1.0);
    for stat in Stat::iter() {
        let spread = if stat.is_primary() { 0.10 } else { 0.05 };
        let roll = rng.fraction("growth roll");
        let value = 1.0 - spread + 2.0 * spread * roll;
        *growth.get_mut(stat) = (value * 1000.0).round() / 1000.0;
    }
    growth
}
