use crate::battle::state::{Combatant, TurnRng};
use crate::battle::stats;
use crate::monster::roll_growth;
use crate::store::NewMonster;

/// Flat capture odds once the enemy is down.
pub const CAPTURE_CHANCE: f64 = 0.6;

pub fn roll_capture_success(rng: &mut TurnRng) -> bool {
    rng.chance(CAPTURE_CHANCE, "capture roll")
}

/// A party row for a captured enemy: same species, level and moves, a fresh
/// growth roll, and full HP derived from that growth.
pub fn captured_monster(enemy: &Combatant, rng: &mut TurnRng) -> NewMonster {
    let growth = roll_growth(rng);
    let max_hp = stats::derive(&enemy.base_stats, &growth, enemy.level).hp;
    NewMonster {
        species_id: enemy.species_id,
        nickname: None,
        level: enemy.level,
        hp: max_hp,
        max_hp,
        growth,
        moves: enemy.moves.clone(),
    }
}
