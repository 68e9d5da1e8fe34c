// In: src/battle/move_effects/stat_effects.rs

use super::Duel;
use crate::battle::state::{BattleEvent, EventBus};
use schema::{Effect, Stat};

/// Add the effect's signed fraction to the target side's modifier for `stat`.
/// Repeated changes to the same stat accumulate for the rest of the battle.
pub(super) fn apply_stat_change_effect(effect: &Effect, duel: &mut Duel, bus: &mut EventBus) {
    let target = duel.target(effect.target);
    let name = target.display_name();
    let side = target.side;

    let Ok(stat) = effect.stat.parse::<Stat>() else {
        tracing::debug!("'{}' names unknown stat '{}'", effect.code, effect.stat);
        bus.push(BattleEvent::NoNoticeableEffect {
            target: name,
            code: effect.code.clone(),
        });
        return;
    };

    let amount = effect.amount.unwrap_or(0.0);
    let total = duel.mods.add(side, stat, amount);
    tracing::debug!(?side, %stat, amount, total, "stat modifier accumulated");

    bus.push(BattleEvent::StatChanged {
        target: name,
        stat,
        percent: (amount * 100.0).round() as i32,
    });
}
