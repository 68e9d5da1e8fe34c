use crate::content::MoveRecord;
use schema::{Effect, EffectTarget, Stat, ACCURACY_UP};

pub const DEFAULT_ACCURACY: f64 = 0.95;
/// Self-targeted effects are treated as this accurate but never actually roll.
pub const SELF_ACCURACY: f64 = 0.99;
pub const ACCURACY_UP_BONUS: f64 = 0.10;
pub const MIN_ACCURACY: f64 = 0.05;
pub const MAX_ACCURACY: f64 = 0.99;

/// Power used when neither the effect nor the move declares one.
pub const FALLBACK_POWER: f64 = 1.0;

/// Power of the generic hit used for a move with an empty stack.
pub const STRUGGLE_POWER: f64 = 8.0;

const ATK_DEF_RATIO_MIN: f64 = 0.25;
const ATK_DEF_RATIO_MAX: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageChannel {
    Physical,
    Special,
}

impl DamageChannel {
    /// MAG damage is special; every other channel is physical.
    pub fn from_stat_key(key: &str) -> Self {
        if key.eq_ignore_ascii_case("MAG") {
            DamageChannel::Special
        } else {
            DamageChannel::Physical
        }
    }

    /// (attacking stat, defending stat)
    pub fn stats(self) -> (Stat, Stat) {
        match self {
            DamageChannel::Physical => (Stat::Phy, Stat::Def),
            DamageChannel::Special => (Stat::Mag, Stat::Res),
        }
    }
}

/// Hit chance for one effect of a move.
pub fn effect_accuracy(effect: &Effect, record: &MoveRecord) -> f64 {
    if effect.target == EffectTarget::User {
        return SELF_ACCURACY;
    }
    let base = effect
        .accuracy
        .or(record.accuracy)
        .unwrap_or(DEFAULT_ACCURACY);
    with_bonuses(base, record)
}

/// Add bonus modifiers and clamp to [0.05, 0.99].
pub fn with_bonuses(base: f64, record: &MoveRecord) -> f64 {
    let boosted = if record.has_bonus(ACCURACY_UP) {
        base + ACCURACY_UP_BONUS
    } else {
        base
    };
    boosted.clamp(MIN_ACCURACY, MAX_ACCURACY)
}

/// Effect amount, then the move's declared power, then 1.
pub fn effect_power(effect: &Effect, record: &MoveRecord) -> f64 {
    effect.amount.or(record.power).unwrap_or(FALLBACK_POWER)
}

/// `max(1, round(power * (0.6 + 0.08 * level) * clamp(atk / def, 0.25, 2.5)))`
pub fn calculate_damage(power: f64, attacker_level: u32, attack: u32, defense: u32) -> u32 {
    let ratio = (f64::from(attack) / f64::from(defense.max(1))).clamp(ATK_DEF_RATIO_MIN, ATK_DEF_RATIO_MAX);
    let level_scale = 0.6 + 0.08 * f64::from(attacker_level);
    let raw = (power * level_scale * ratio).round();
    if raw < 1.0 {
        1
    } else {
        raw as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MoveId;
    use rstest::rstest;
    use schema::EffectType;

    fn record(bonuses: &[&str], accuracy: Option<f64>) -> MoveRecord {
        MoveRecord {
            id: MoveId(1),
            name: "test".to_string(),
            stack_effects: vec!["dmg_phys".to_string()],
            stack_bonuses: bonuses.iter().map(|b| b.to_string()).collect(),
            power: None,
            accuracy,
        }
    }

    fn effect(target: EffectTarget, accuracy: Option<f64>) -> Effect {
        Effect {
            code: "dmg_phys".to_string(),
            target,
            accuracy,
            effect_type: EffectType::Damage,
            stat: "PHY".to_string(),
            amount: Some(10.0),
            base_flag_eligible: true,
            base_pp: Some(25),
            priority: 0,
        }
    }

    #[rstest]
    #[case(None, None, &[], 0.95)]
    #[case(Some(0.7), None, &[], 0.7)]
    #[case(None, Some(0.6), &[], 0.6)]
    #[case(Some(0.7), Some(0.6), &["accuracy_up"], 0.8)]
    #[case(None, None, &["accuracy_up"], 0.99)]
    #[case(Some(0.01), None, &[], 0.05)]
    fn test_effect_accuracy(
        #[case] effect_acc: Option<f64>,
        #[case] move_acc: Option<f64>,
        #[case] bonuses: &[&str],
        #[case] expected: f64,
    ) {
        let acc = effect_accuracy(&effect(EffectTarget::Target, effect_acc), &record(bonuses, move_acc));
        assert!((acc - expected).abs() < 1e-9, "got {acc}, expected {expected}");
    }

    #[test]
    fn test_self_effects_ignore_configured_accuracy() {
        let acc = effect_accuracy(&effect(EffectTarget::User, Some(0.1)), &record(&[], None));
        assert_eq!(acc, SELF_ACCURACY);
    }

    #[rstest]
    #[case(10.0, 3, 30, 20, 13)] // 10 * 0.84 * 1.5 = 12.6
    #[case(10.0, 1, 1, 1000, 2)] // ratio clamps to 0.25: 10 * 0.68 * 0.25 = 1.7
    #[case(10.0, 1, 1000, 1, 17)] // ratio clamps to 2.5: 10 * 0.68 * 2.5 = 17
    #[case(0.1, 1, 10, 10, 1)] // floor of 1
    fn test_calculate_damage(
        #[case] power: f64,
        #[case] level: u32,
        #[case] attack: u32,
        #[case] defense: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(calculate_damage(power, level, attack, defense), expected);
    }

    #[test]
    fn test_channels() {
        assert_eq!(DamageChannel::from_stat_key("MAG"), DamageChannel::Special);
        assert_eq!(DamageChannel::from_stat_key("PHY"), DamageChannel::Physical);
        assert_eq!(DamageChannel::Special.stats(), (Stat::Mag, Stat::Res));
    }
}
