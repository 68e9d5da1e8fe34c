// In: src/battle/move_effects/special_effects.rs

use super::damage_effects::deal_damage;
use super::{Duel, EffectContext};
use crate::battle::calculators::{self, DamageChannel};
use crate::battle::state::{BattleEvent, EventBus, TurnRng};
use schema::{Effect, EffectTarget};

/// Effect kinds without a rule resolve as a logged no-op hit.
pub(super) fn apply_custom_effect(kind: &str, effect: &Effect, duel: &mut Duel, bus: &mut EventBus) {
    tracing::debug!("No rule for effect type '{}' ({}), treating as a no-op", kind, effect.code);
    bus.push(BattleEvent::EffectApplied {
        user: duel.attacker.display_name(),
        code: effect.code.clone(),
    });
}

/// A single physical hit for a move whose stack is empty. Returns true on hit.
pub(super) fn apply_generic_hit(
    context: &EffectContext,
    duel: &mut Duel,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> bool {
    let accuracy = calculators::with_bonuses(calculators::DEFAULT_ACCURACY, context.record);
    if !rng.chance(accuracy, "generic hit accuracy") {
        bus.push(duel.miss(context));
        return false;
    }
    deal_damage(
        DamageChannel::Physical,
        calculators::STRUGGLE_POWER,
        EffectTarget::Target,
        context,
        duel,
        bus,
    );
    true
}
