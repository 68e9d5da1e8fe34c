use crate::battle::state::{Combatant, Side, TurnRng};
use crate::battle::stats;
use crate::content::ContentRegistry;
use crate::errors::{ContentError, ContentResult};
use crate::monster::{MoveSlot, MAX_MOVE_SLOTS};
use schema::{neutral_growth, SpeciesData};

const EXTRA_EFFECT_CHANCE_PER_LEVEL: f64 = 0.05;
const EXTRA_EFFECT_CHANCE_CAP: f64 = 0.5;
const BONUS_CHANCE_PER_LEVEL: f64 = 0.04;
const BONUS_CHANCE_CAP: f64 = 0.4;

/// Wild level within `spread` of the lead monster's level, never below 1.
pub fn roll_wild_level(lead_level: u32, spread: u32, rng: &mut TurnRng) -> u32 {
    let low = lead_level.saturating_sub(spread).max(1);
    let high = lead_level.saturating_add(spread).max(low);
    rng.range(low, high, "wild level")
}

/// Largest loadout a wild monster of `level` can carry.
pub fn max_loadout(level: u32) -> u32 {
    (1 + level / 3).min(MAX_MOVE_SLOTS as u32)
}

pub fn extra_effect_chance(level: u32) -> f64 {
    (EXTRA_EFFECT_CHANCE_PER_LEVEL * f64::from(level)).min(EXTRA_EFFECT_CHANCE_CAP)
}

pub fn bonus_chance(level: u32) -> f64 {
    (BONUS_CHANCE_PER_LEVEL * f64::from(level)).min(BONUS_CHANCE_CAP)
}

/// Assemble a random move loadout from the registry's effects and bonuses.
///
/// Each move gets one base effect, maybe one extra effect and maybe one bonus,
/// with the odds of the extras growing with level.
pub fn roll_loadout(content: &ContentRegistry, level: u32, rng: &mut TurnRng) -> ContentResult<Vec<MoveSlot>> {
    let bases = content.base_effects();
    if bases.is_empty() {
        return Err(ContentError::NoBaseEffects);
    }
    let extras = content.extra_effects();
    let bonuses = content.bonuses();

    let count = rng.range(1, max_loadout(level), "loadout size");
    let mut loadout = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut stack = vec![pick(&bases, rng, "base effect").code.clone()];
        if !extras.is_empty() && rng.chance(extra_effect_chance(level), "extra effect") {
            stack.push(pick(&extras, rng, "extra effect pick").code.clone());
        }
        let mut bonus_codes = Vec::new();
        if !bonuses.is_empty() && rng.chance(bonus_chance(level), "bonus") {
            bonus_codes.push(pick(&bonuses, rng, "bonus pick").code.clone());
        }

        let record = content.ensure_move(&stack, &bonus_codes)?;
        let max_pp = content.max_pp_for_stack(&record.stack_effects);
        loadout.push(MoveSlot::new(record.id, max_pp));
    }
    Ok(loadout)
}

fn pick<'a, T>(items: &[&'a T], rng: &mut TurnRng, reason: &str) -> &'a T {
    let index = rng.range(0, items.len() as u32 - 1, reason) as usize;
    items[index.min(items.len() - 1)]
}

/// Build a wild enemy snapshot for `species`.
pub fn generate_wild(
    content: &ContentRegistry,
    species: &SpeciesData,
    lead_level: u32,
    spread: u32,
    rng: &mut TurnRng,
) -> ContentResult<Combatant> {
    let level = roll_wild_level(lead_level, spread, rng);
    let moves = roll_loadout(content, level, rng)?;
    let growth = neutral_growth();
    let max_hp = stats::derive(&species.base_stats, &growth, level).hp;
    tracing::debug!(
        "Generated wild {} Lv{} with {} move(s)",
        species.name,
        level,
        moves.len()
    );

    Ok(Combatant {
        side: Side::Enemy,
        monster_id: None,
        species_id: species.id,
        species_name: species.name.clone(),
        nickname: None,
        level,
        hp: max_hp,
        max_hp,
        growth,
        base_stats: species.base_stats,
        moves,
        status: None,
    })
}
