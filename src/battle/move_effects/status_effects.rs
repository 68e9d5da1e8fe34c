// In: src/battle/move_effects/status_effects.rs

use super::Duel;
use crate::battle::state::{BattleEvent, EventBus};
use schema::{Effect, EffectTarget};

/// Set a status on the effect's target unless it already carries one.
pub(super) fn apply_status_effect(effect: &Effect, duel: &mut Duel, bus: &mut EventBus) {
    let status = effect.stat.to_lowercase();
    let target = duel.target_mut(effect.target);

    if target.has_status() {
        let existing = target.status.clone().unwrap_or_default();
        tracing::debug!("{} already has '{}', ignoring '{}'", target.display_name(), existing, status);
        bus.push(BattleEvent::StatusIgnored {
            target: target.display_name(),
            existing,
            attempted: status,
        });
        return;
    }

    target.status = Some(status.clone());
    bus.push(BattleEvent::StatusApplied {
        target: target.display_name(),
        status,
        self_inflicted: effect.target == EffectTarget::User,
    });
}
