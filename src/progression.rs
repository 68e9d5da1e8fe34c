//! Experience, level-ups and learn-list promotion.

use crate::battle::state::{BattleEvent, TurnRng};
use crate::errors::StoreResult;
use crate::monster::{Monster, TraitKind, MAX_LEARN_PERCENT};
use crate::store::{MonsterPatch, PartyStore};
use schema::BaseStats;

const MIN_XP_GAIN: u32 = 5;
const MIN_LEVEL_UP_HEAL: u32 = 2;

/// XP for defeating an enemy: `max(5, round(10 + 4 * level))`.
pub fn xp_for_defeat(enemy_level: u32) -> u32 {
    let raw = (10.0 + f64::from(enemy_level) * 4.0).round() as u32;
    raw.max(MIN_XP_GAIN)
}

/// XP needed to leave `level`: `20 + 10 * level²`.
pub fn xp_to_next_level(level: u32) -> u32 {
    20 + level.saturating_mul(level).saturating_mul(10)
}

/// Result of one XP award.
#[derive(Debug, Clone, PartialEq)]
pub struct XpAward {
    pub monster: Monster,
    pub xp_gained: u32,
    pub levels_gained: u32,
    pub events: Vec<BattleEvent>,
}

/// Add `xp` to `monster` in memory, running the level-up loop.
///
/// Each level recomputes max HP from the monster's fixed growth and heals by
/// `max(2, delta / 2)` capped at the new max, then rolls the learn list.
pub fn apply_xp(
    monster: &mut Monster,
    base: &BaseStats,
    xp: u32,
    name: &str,
    rng: &mut TurnRng,
) -> (u32, Vec<BattleEvent>) {
    let mut events = vec![BattleEvent::ExperienceGained {
        name: name.to_string(),
        xp,
    }];
    monster.xp = monster.xp.saturating_add(xp);

    let mut levels_gained = 0;
    while monster.xp >= xp_to_next_level(monster.level) {
        monster.xp -= xp_to_next_level(monster.level);
        monster.level += 1;
        levels_gained += 1;

        let old_max = monster.max_hp;
        let new_max = monster.derived_max_hp(base);
        let heal = (new_max.saturating_sub(old_max) / 2).max(MIN_LEVEL_UP_HEAL);
        monster.max_hp = new_max;
        // A fainted monster stays down.
        if !monster.is_fainted() {
            monster.hp = monster.hp.saturating_add(heal).min(new_max);
        }

        tracing::info!("{} reached level {}", name, monster.level);
        events.push(BattleEvent::LevelUp {
            name: name.to_string(),
            level: monster.level,
        });
        events.extend(roll_learn_list(monster, name, rng));
    }
    (levels_gained, events)
}

/// Roll every learn-list entry once, promoting codes whose roll lands at or
/// under their stored percent.
pub fn roll_learn_list(monster: &mut Monster, name: &str, rng: &mut TurnRng) -> Vec<BattleEvent> {
    let mut events = Vec::new();
    for kind in [TraitKind::Effect, TraitKind::Bonus] {
        let entries: Vec<(String, u8)> = monster
            .learn_list
            .entries_mut(kind)
            .iter()
            .map(|(code, percent)| (code.clone(), *percent))
            .collect();

        for (code, percent) in entries {
            let roll = rng.next_outcome("learn list roll");
            if roll > percent.min(MAX_LEARN_PERCENT) {
                continue;
            }
            monster.learn_list.entries_mut(kind).remove(&code);
            if monster.learned_pool.insert(kind, code.clone()) {
                tracing::info!("{} learned {} '{}'", name, kind, code);
                events.push(BattleEvent::TraitLearned {
                    name: name.to_string(),
                    kind,
                    code,
                });
            }
        }
    }
    events
}

/// Award defeat XP and persist xp, level, hp, max hp, learned pool and learn
/// list in one write.
pub fn award_xp(
    party: &dyn PartyStore,
    mut monster: Monster,
    base: &BaseStats,
    enemy_level: u32,
    name: &str,
    rng: &mut TurnRng,
) -> StoreResult<XpAward> {
    let xp_gained = xp_for_defeat(enemy_level);
    let (levels_gained, events) = apply_xp(&mut monster, base, xp_gained, name, rng);

    let patch = MonsterPatch {
        level: Some(monster.level),
        xp: Some(monster.xp),
        hp: Some(monster.hp),
        max_hp: Some(monster.max_hp),
        learned_pool: Some(monster.learned_pool.clone()),
        learn_list: Some(monster.learn_list.clone()),
        ..Default::default()
    };
    let monster = party.mutate(monster.id, patch)?;
    tracing::debug!(
        "Awarded {} xp to {:?}: level {}, {} xp banked",
        xp_gained,
        monster.id,
        monster.level,
        monster.xp
    );

    Ok(XpAward {
        monster,
        xp_gained,
        levels_gained,
        events,
    })
}
