// In: src/battle/move_effects/mod.rs

mod damage_effects;
mod special_effects;
mod stat_effects;
mod status_effects;

use crate::battle::calculators;
use crate::battle::state::{BattleEvent, Combatant, EventBus, TurnRng};
use crate::battle::stats::{self, BattleMods};
use crate::content::{ContentRegistry, MoveRecord};
use schema::{EffectTarget, EffectType, Stat};

use self::{damage_effects::*, special_effects::*, stat_effects::*, status_effects::*};

/// What one move invocation is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct EffectContext<'a> {
    pub content: &'a ContentRegistry,
    pub record: &'a MoveRecord,
    /// Display name: the slot's custom name or the canonical move name.
    pub move_name: &'a str,
}

/// Both combatants of one move invocation plus the battle's stat modifiers.
pub struct Duel<'a> {
    pub attacker: &'a mut Combatant,
    pub defender: &'a mut Combatant,
    pub mods: &'a mut BattleMods,
}

impl Duel<'_> {
    pub fn target(&self, target: EffectTarget) -> &Combatant {
        match target {
            EffectTarget::User => &*self.attacker,
            EffectTarget::Target => &*self.defender,
        }
    }

    pub fn target_mut(&mut self, target: EffectTarget) -> &mut Combatant {
        match target {
            EffectTarget::User => &mut *self.attacker,
            EffectTarget::Target => &mut *self.defender,
        }
    }

    /// A combatant's derived stat with its side's accumulated modifier applied.
    pub fn live_stat(&self, target: EffectTarget, stat: Stat) -> u32 {
        let combatant = self.target(target);
        let derived = combatant.derived_stats().get(stat);
        stats::apply_modifier(derived, self.mods.side(combatant.side).get(stat))
    }

    fn miss(&self, context: &EffectContext) -> BattleEvent {
        BattleEvent::MoveMissed {
            attacker: self.attacker.display_name(),
            defender: self.defender.display_name(),
            move_name: context.move_name.to_string(),
        }
    }
}

/// How one move invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub effects_hit: usize,
    pub defender_fainted: bool,
    pub attacker_fainted: bool,
}

/// Resolve a move's effect stack in order.
///
/// Every effect rolls accuracy on its own; a miss only skips that effect.
/// Self-targeted effects never roll. Resolution stops as soon as the defender
/// is at 0 hp.
pub fn resolve_move(
    context: &EffectContext,
    duel: &mut Duel,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> MoveOutcome {
    bus.push(BattleEvent::MoveUsed {
        user: duel.attacker.display_name(),
        move_name: context.move_name.to_string(),
    });

    let mut outcome = MoveOutcome::default();
    if context.record.stack_effects.is_empty() {
        tracing::warn!("Move '{}' has an empty stack, using a generic hit", context.move_name);
        if apply_generic_hit(context, duel, rng, bus) {
            outcome.effects_hit += 1;
        }
    }

    for code in &context.record.stack_effects {
        if duel.defender.is_fainted() {
            tracing::debug!("Defender is down, skipping the rest of '{}'", context.move_name);
            break;
        }
        let Some(effect) = context.content.effect_by_code(code) else {
            tracing::warn!("Move '{}' references unknown effect '{}'", context.move_name, code);
            continue;
        };

        if effect.target == EffectTarget::Target {
            let accuracy = calculators::effect_accuracy(effect, context.record);
            if !rng.chance(accuracy, "effect accuracy") {
                tracing::debug!("'{}' missed (accuracy {:.2})", code, accuracy);
                bus.push(duel.miss(context));
                continue;
            }
        }
        outcome.effects_hit += 1;

        match &effect.effect_type {
            EffectType::Damage => {
                apply_damage_effect(effect, context, duel, bus);
            }
            EffectType::Status => apply_status_effect(effect, duel, bus),
            EffectType::StatChange => apply_stat_change_effect(effect, duel, bus),
            EffectType::Custom(kind) => apply_custom_effect(kind, effect, duel, bus),
        }
    }

    outcome.defender_fainted = duel.defender.is_fainted();
    outcome.attacker_fainted = duel.attacker.is_fainted();
    outcome
}
