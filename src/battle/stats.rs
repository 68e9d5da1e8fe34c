use crate::battle::state::Side;
use schema::{BaseStats, DerivedStats, Growth, Stat, StatBlock};
use serde::{Deserialize, Serialize};

/// Each level past 1 adds this fraction of the base value.
const LEVEL_CURVE_STEP: f64 = 0.075;

/// Accumulated signed fractions per stat, e.g. `phy: 0.4` after two +20% boosts.
pub type StatMods = StatBlock<f64>;

/// Temporary stat modifiers for both sides. Reset at battle start, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BattleMods {
    pub you: StatMods,
    pub enemy: StatMods,
}

impl BattleMods {
    pub fn side(&self, side: Side) -> &StatMods {
        match side {
            Side::You => &self.you,
            Side::Enemy => &self.enemy,
        }
    }

    /// Add `fraction` to the side's accumulator and return the new total.
    pub fn add(&mut self, side: Side, stat: Stat, fraction: f64) -> f64 {
        let mods = match side {
            Side::You => &mut self.you,
            Side::Enemy => &mut self.enemy,
        };
        let slot = mods.get_mut(stat);
        *slot += fraction;
        *slot
    }
}

pub fn level_factor(level: u32) -> f64 {
    1.0 + f64::from(level.saturating_sub(1)) * LEVEL_CURVE_STEP
}

/// Derive current stats from species base, growth and level.
///
/// HP/PHY/MAG/DEF/RES/SPD follow the level curve; ACC and EVA do not. Every
/// stat is at least 1. Pure, so callers recompute instead of caching.
pub fn derive(base: &BaseStats, growth: &Growth, level: u32) -> DerivedStats {
    let factor = level_factor(level);
    base.map(|stat, value| {
        let scaled = f64::from(value) * growth.get(stat);
        let curved = if stat.is_primary() { scaled * factor } else { scaled };
        curved.max(1.0).round() as u32
    })
}

/// `round(base * (1 + fraction))`, floored at 1.
pub fn apply_modifier(base: u32, fraction: f64) -> u32 {
    let modified = (f64::from(base) * (1.0 + fraction)).round();
    if modified < 1.0 {
        1
    } else {
        modified as u32
    }
}

/// Derived stats with a side's accumulated modifiers applied.
pub fn effective_stats(derived: &DerivedStats, mods: &StatMods) -> DerivedStats {
    derived.map(|stat, value| apply_modifier(value, mods.get(stat)))
}
