// In: src/battle/move_effects/damage_effects.rs

use super::{Duel, EffectContext};
use crate::battle::calculators::{self, DamageChannel};
use crate::battle::state::{BattleEvent, EventBus};
use schema::{Effect, EffectTarget};

/// Deal damage to the effect's target. Returns the damage dealt.
pub(super) fn apply_damage_effect(
    effect: &Effect,
    context: &EffectContext,
    duel: &mut Duel,
    bus: &mut EventBus,
) -> u32 {
    let channel = DamageChannel::from_stat_key(&effect.stat);
    let power = calculators::effect_power(effect, context.record);
    deal_damage(channel, power, effect.target, context, duel, bus)
}

pub(super) fn deal_damage(
    channel: DamageChannel,
    power: f64,
    target: EffectTarget,
    context: &EffectContext,
    duel: &mut Duel,
    bus: &mut EventBus,
) -> u32 {
    let (attack_stat, defense_stat) = channel.stats();
    let attack = duel.live_stat(EffectTarget::User, attack_stat);
    let defense = duel.live_stat(target, defense_stat);
    let damage = calculators::calculate_damage(power, duel.attacker.level, attack, defense);

    let attacker = duel.attacker.display_name();
    let receiver = duel.target_mut(target);
    let remaining = receiver.take_damage(damage);
    tracing::debug!(
        ?channel,
        power,
        attack,
        defense,
        damage,
        remaining,
        "damage resolved"
    );

    bus.push(BattleEvent::DamageDealt {
        attacker,
        move_name: context.move_name.to_string(),
        damage,
        defender: receiver.display_name(),
    });
    damage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::{Combatant, Side};
    use crate::battle::stats::BattleMods;
    use crate::battle::tests::common::{test_content, CombatantBuilder};
    use crate::content::{MoveId, MoveRecord};
    use pretty_assertions::assert_eq;

    fn context_parts() -> (crate::content::ContentRegistry, MoveRecord) {
        let record = MoveRecord {
            id: MoveId(1),
            name: "Tackle".to_string(),
            stack_effects: vec!["dmg_phys".to_string()],
            stack_bonuses: vec![],
            power: None,
            accuracy: None,
        };
        (test_content(), record)
    }

    fn hit(attacker: &mut Combatant, defender: &mut Combatant, mods: &mut BattleMods) -> (u32, EventBus) {
        let (content, record) = context_parts();
        let effect = content.effect_by_code("dmg_phys").unwrap().clone();
        let context = EffectContext {
            content: &content,
            record: &record,
            move_name: "Tackle",
        };
        let mut duel = Duel {
            attacker,
            defender,
            mods,
        };
        let mut bus = EventBus::new();
        let damage = apply_damage_effect(&effect, &context, &mut duel, &mut bus);
        (damage, bus)
    }

    #[test]
    fn test_damage_uses_live_stats_and_logs() {
        // Flat 10 base stats, level 1: PHY 10, DEF 10. dmg_phys power 10.
        // 10 * (0.6 + 0.08) * 1.0 = 6.8 -> 7
        let mut you = CombatantBuilder::new(Side::You).with_base(10).with_level(1).build();
        let mut enemy = CombatantBuilder::new(Side::Enemy).with_base(10).with_level(1).with_hp(50).build();
        let mut mods = BattleMods::default();

        let (damage, bus) = hit(&mut you, &mut enemy, &mut mods);

        assert_eq!(damage, 7);
        assert_eq!(enemy.hp, 43);
        assert_eq!(
            bus.lines(),
            vec!["Your Sproutle's Tackle dealt 7 damage to Wild Sproutle.".to_string()]
        );
    }

    #[test]
    fn test_attack_modifier_raises_damage() {
        let mut you = CombatantBuilder::new(Side::You).with_base(10).with_level(1).build();
        let mut enemy = CombatantBuilder::new(Side::Enemy).with_base(10).with_level(1).with_hp(50).build();
        let mut mods = BattleMods::default();
        mods.you.phy = 0.4;

        // PHY 14 vs DEF 10: 10 * 0.68 * 1.4 = 9.52 -> 10
        let (damage, _) = hit(&mut you, &mut enemy, &mut mods);
        assert_eq!(damage, 10);
    }

    #[test]
    fn test_damage_floors_hp_at_zero_and_deals_at_least_one() {
        let mut you = CombatantBuilder::new(Side::You).with_base(1).with_level(1).build();
        let mut enemy = CombatantBuilder::new(Side::Enemy).with_base(200).with_level(1).with_hp(1).build();
        let mut mods = BattleMods::default();

        let (damage, _) = hit(&mut you, &mut enemy, &mut mods);
        assert!(damage >= 1);
        assert_eq!(enemy.hp, 0);
    }
}
