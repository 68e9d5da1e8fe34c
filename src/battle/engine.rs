use crate::battle::catch::{can_attempt_capture, captured_monster, roll_capture_success};
use crate::battle::encounter;
use crate::battle::move_effects::{resolve_move, Duel, EffectContext, MoveOutcome};
use crate::battle::state::{BattleEvent, BattleSession, Combatant, EventBus, Side, TurnRng};
use crate::battle::stats::BattleMods;
use crate::content::{ContentRegistry, MoveId, MoveRecord};
use crate::errors::{BattleError, BattleResult};
use crate::monster::{Monster, MonsterId, TraitKind};
use crate::progression;
use crate::species::SpeciesStore;
use crate::store::{MonsterPatch, PartyStore, PlayerId, WorldStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Odds that a run action gets away.
pub const ESCAPE_CHANCE: f64 = 0.8;

/// The collaborators one battle operation works against.
#[derive(Clone, Copy)]
pub struct BattleContext<'a> {
    pub content: &'a ContentRegistry,
    pub species: &'a dyn SpeciesStore,
    pub party: &'a dyn PartyStore,
    pub world: &'a dyn WorldStore,
}

/// A player's choice for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TurnAction {
    Move { slot: usize },
    Switch { index: usize },
    Run,
}

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Escaped,
    Captured { monster_id: MonsterId },
    #[serde(rename = "you_team_wiped")]
    TeamWiped,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Ongoing,
    Ended(BattleOutcome),
}

/// Roll a wild encounter for the player's tile and open a battle against it.
pub fn start_battle(
    ctx: &BattleContext,
    player: &PlayerId,
    wild_level_spread: u32,
    rng: &mut TurnRng,
) -> BattleResult<BattleSession> {
    let party = ctx.party.get(player)?;
    let lead = party
        .iter()
        .find(|m| !m.is_fainted())
        .ok_or(BattleError::YouFainted)?;
    let tile = ctx.world.current_tile(player)?;
    let species = ctx.species.weighted_random_for_biome(tile.biome, rng)?;
    let enemy = encounter::generate_wild(ctx.content, &species, lead.level, wild_level_spread, rng)?;
    begin_battle(ctx, player, enemy)
}

/// Open a battle against a given enemy, sending out the first living party member.
pub fn begin_battle(ctx: &BattleContext, player: &PlayerId, enemy: Combatant) -> BattleResult<BattleSession> {
    let party = ctx.party.get(player)?;
    let (you_index, lead) = party
        .iter()
        .enumerate()
        .find(|(_, m)| !m.is_fainted())
        .ok_or(BattleError::YouFainted)?;
    let you = snapshot(ctx, lead)?;
    let enemy = Combatant {
        side: Side::Enemy,
        ..enemy
    };

    let mut log = EventBus::new();
    log.push(BattleEvent::WildAppeared {
        enemy: enemy.species_name.clone(),
        level: enemy.level,
    });
    log.push(BattleEvent::SentOut {
        name: you.display_name(),
    });
    tracing::info!(
        "Battle started for {}: {} Lv{} vs wild {} Lv{}",
        player,
        you.species_name,
        you.level,
        enemy.species_name,
        enemy.level
    );

    Ok(BattleSession {
        player: player.clone(),
        you,
        you_index,
        enemy,
        mods: BattleMods::default(),
        allow_capture: false,
        require_switch: false,
        log,
        turn_number: 1,
        benched_status: BTreeMap::new(),
    })
}

/// Apply one player action. Rejected actions leave the session untouched.
pub fn submit_turn(
    ctx: &BattleContext,
    session: &mut BattleSession,
    action: TurnAction,
    rng: &mut TurnRng,
) -> BattleResult<TurnStatus> {
    tracing::debug!(turn = session.turn_number, ?action, "turn submitted");
    match action {
        TurnAction::Move { slot } => use_move(ctx, session, slot, rng),
        TurnAction::Switch { index } => switch(ctx, session, index, rng),
        TurnAction::Run => run(session, rng),
    }
}

/// Try to capture the knocked-out enemy.
pub fn attempt_capture(ctx: &BattleContext, session: &mut BattleSession, rng: &mut TurnRng) -> BattleResult<TurnStatus> {
    can_attempt_capture(session)?;
    let target = session.enemy.display_name();

    if !roll_capture_success(rng) {
        session.log.push(BattleEvent::CaptureFailed { target });
        return Ok(TurnStatus::Ongoing);
    }

    let monster = ctx.party.create(&session.player, captured_monster(&session.enemy, rng))?;
    tracing::info!("{} captured {} as {:?}", session.player, session.enemy.species_name, monster.id);
    session.log.push(BattleEvent::Captured { target });
    Ok(TurnStatus::Ended(BattleOutcome::Captured {
        monster_id: monster.id,
    }))
}

fn ensure_can_act(session: &BattleSession) -> BattleResult<()> {
    if session.require_switch {
        return Err(BattleError::MustSwitchFirst);
    }
    if session.allow_capture {
        return Err(BattleError::CaptureOrFinishPending);
    }
    Ok(())
}

fn use_move(ctx: &BattleContext, session: &mut BattleSession, slot: usize, rng: &mut TurnRng) -> BattleResult<TurnStatus> {
    ensure_can_act(session)?;
    let chosen = session
        .you
        .moves
        .get(slot)
        .ok_or(BattleError::BadMoveReference(slot))?;
    let record = ctx.content.move_by_id(chosen.move_id)?;
    if chosen.current_pp == 0 {
        return Err(BattleError::NoPP(slot));
    }
    let move_name = chosen.name_custom.clone().unwrap_or_else(|| record.name.clone());
    let enemy_move = enemy_move(ctx, &session.enemy)?;
    let enemy_first = ctx.content.move_priority(&enemy_move) > 0;

    if enemy_first {
        if let Some(status) = enemy_turn(ctx, session, &enemy_move, rng)? {
            return Ok(status);
        }
    }

    if let Some(chosen) = session.you.moves.get_mut(slot) {
        chosen.use_pp();
    }
    let outcome = resolve(ctx, session, Side::You, &record, &move_name, rng);
    persist_active(ctx, session)?;
    session.turn_number += 1;

    match (outcome.defender_fainted, outcome.attacker_fainted) {
        (true, true) => return double_knockout(ctx, session, false, rng),
        (true, false) => {
            on_enemy_defeated(ctx, session, rng)?;
            return Ok(TurnStatus::Ongoing);
        }
        (false, true) => return handle_active_fainted(ctx, session),
        (false, false) => {}
    }
    if !enemy_first {
        if let Some(status) = enemy_turn(ctx, session, &enemy_move, rng)? {
            return Ok(status);
        }
    }
    Ok(TurnStatus::Ongoing)
}

fn switch(ctx: &BattleContext, session: &mut BattleSession, index: usize, rng: &mut TurnRng) -> BattleResult<TurnStatus> {
    if session.allow_capture {
        return Err(BattleError::CaptureOrFinishPending);
    }
    let party = ctx.party.get(&session.player)?;
    let incoming = party
        .get(index)
        .filter(|m| index != session.you_index && !m.is_fainted())
        .ok_or(BattleError::BadPartyIndex(index))?;

    if session.require_switch {
        send_in(ctx, session, index, incoming)?;
        session.require_switch = false;
        session.log.push(BattleEvent::SentOut {
            name: session.you.display_name(),
        });
        return Ok(TurnStatus::Ongoing);
    }

    let enemy_move = enemy_move(ctx, &session.enemy)?;
    let enemy_first = ctx.content.move_priority(&enemy_move) > 0;

    // A priority move lands on the monster being withdrawn.
    if enemy_first {
        let name = enemy_move.name.clone();
        resolve(ctx, session, Side::Enemy, &enemy_move, &name, rng);
        persist_active(ctx, session)?;
        if session.you.is_fainted() {
            session.log.push(BattleEvent::Fainted {
                name: session.you.display_name(),
            });
        }
    }

    let outgoing = session.you.display_name();
    let outgoing_fainted = session.you.is_fainted();
    send_in(ctx, session, index, incoming)?;
    let incoming_name = session.you.display_name();
    if outgoing_fainted {
        session.log.push(BattleEvent::SentOut { name: incoming_name });
    } else {
        session.log.push(BattleEvent::Withdrawn {
            from: outgoing,
            to: incoming_name,
        });
    }
    session.turn_number += 1;

    if enemy_first {
        if session.enemy.is_fainted() {
            on_enemy_defeated(ctx, session, rng)?;
        }
        return Ok(TurnStatus::Ongoing);
    }
    Ok(enemy_turn(ctx, session, &enemy_move, rng)?.unwrap_or(TurnStatus::Ongoing))
}

fn run(session: &mut BattleSession, rng: &mut TurnRng) -> BattleResult<TurnStatus> {
    ensure_can_act(session)?;
    if rng.chance(ESCAPE_CHANCE, "escape") {
        tracing::info!("{} escaped from wild {}", session.player, session.enemy.species_name);
        session.log.push(BattleEvent::Escaped);
        return Ok(TurnStatus::Ended(BattleOutcome::Escaped));
    }
    session.log.push(BattleEvent::EscapeFailed);
    session.turn_number += 1;
    Ok(TurnStatus::Ongoing)
}

/// The enemy always uses its first slot. An enemy with no moves falls back to
/// an empty stack, which resolves as a generic hit.
fn enemy_move(ctx: &BattleContext, enemy: &Combatant) -> BattleResult<Arc<MoveRecord>> {
    match enemy.moves.first() {
        Some(slot) => Ok(ctx.content.move_by_id(slot.move_id)?),
        None => Ok(Arc::new(MoveRecord {
            id: MoveId(0),
            name: "Struggle".to_string(),
            stack_effects: vec![],
            stack_bonuses: vec![],
            power: None,
            accuracy: None,
        })),
    }
}

/// Let the enemy act. Returns a status when the turn has to stop here.
fn enemy_turn(
    ctx: &BattleContext,
    session: &mut BattleSession,
    record: &MoveRecord,
    rng: &mut TurnRng,
) -> BattleResult<Option<TurnStatus>> {
    let name = session.enemy.moves.first().and_then(|s| s.name_custom.clone()).unwrap_or_else(|| record.name.clone());
    let outcome = resolve(ctx, session, Side::Enemy, record, &name, rng);
    persist_active(ctx, session)?;

    match (outcome.defender_fainted, outcome.attacker_fainted) {
        (true, true) => double_knockout(ctx, session, true, rng).map(Some),
        (true, false) => handle_active_fainted(ctx, session).map(Some),
        (false, true) => {
            on_enemy_defeated(ctx, session, rng)?;
            Ok(Some(TurnStatus::Ongoing))
        }
        (false, false) => Ok(None),
    }
}

fn resolve(
    ctx: &BattleContext,
    session: &mut BattleSession,
    attacker: Side,
    record: &MoveRecord,
    move_name: &str,
    rng: &mut TurnRng,
) -> MoveOutcome {
    let context = EffectContext {
        content: ctx.content,
        record,
        move_name,
    };
    let (attacker, defender) = match attacker {
        Side::You => (&mut session.you, &mut session.enemy),
        Side::Enemy => (&mut session.enemy, &mut session.you),
    };
    let mut duel = Duel {
        attacker,
        defender,
        mods: &mut session.mods,
    };
    resolve_move(&context, &mut duel, rng, &mut session.log)
}

/// Write the active monster's hp and PP back to its party row.
fn persist_active(ctx: &BattleContext, session: &BattleSession) -> BattleResult<()> {
    let Some(id) = session.you.monster_id else {
        return Ok(());
    };
    ctx.party.mutate(
        id,
        MonsterPatch {
            hp: Some(session.you.hp),
            moves: Some(session.you.moves.clone()),
            ..Default::default()
        },
    )?;
    Ok(())
}

fn snapshot(ctx: &BattleContext, monster: &Monster) -> BattleResult<Combatant> {
    let species = ctx.species.by_id(monster.species_id)?;
    Ok(Combatant::from_monster(monster, &species))
}

/// Swap the active snapshot, carrying each slot's status across the bench.
fn send_in(ctx: &BattleContext, session: &mut BattleSession, index: usize, monster: &Monster) -> BattleResult<()> {
    let incoming = snapshot(ctx, monster)?;
    if let Some(status) = session.you.status.take() {
        session.benched_status.insert(session.you_index, status);
    }
    session.you = Combatant {
        status: session.benched_status.remove(&index),
        ..incoming
    };
    session.you_index = index;
    tracing::debug!("{} sent in party slot {}", session.player, index);
    Ok(())
}

fn handle_active_fainted(ctx: &BattleContext, session: &mut BattleSession) -> BattleResult<TurnStatus> {
    session.log.push(BattleEvent::Fainted {
        name: session.you.display_name(),
    });
    replace_fainted(ctx, session)
}

/// One move knocked out both sides. The fallen active monster still gets the
/// credit for the enemy, then the usual replacement rules apply. Faints are
/// logged target first.
fn double_knockout(
    ctx: &BattleContext,
    session: &mut BattleSession,
    you_were_target: bool,
    rng: &mut TurnRng,
) -> BattleResult<TurnStatus> {
    let you_fainted = BattleEvent::Fainted {
        name: session.you.display_name(),
    };
    if you_were_target {
        session.log.push(you_fainted.clone());
    }
    on_enemy_defeated(ctx, session, rng)?;
    if !you_were_target {
        session.log.push(you_fainted);
    }
    replace_fainted(ctx, session)
}

/// Zero survivors wipes the team, one is sent in automatically, and two or
/// more leave the choice to the player.
fn replace_fainted(ctx: &BattleContext, session: &mut BattleSession) -> BattleResult<TurnStatus> {
    let party = ctx.party.get(&session.player)?;
    let survivors: Vec<(usize, &Monster)> = party
        .iter()
        .enumerate()
        .filter(|(i, m)| *i != session.you_index && !m.is_fainted())
        .collect();

    match survivors.as_slice() {
        [] => {
            tracing::info!("{}'s team was wiped out", session.player);
            session.log.push(BattleEvent::TeamWiped);
            Ok(TurnStatus::Ended(BattleOutcome::TeamWiped))
        }
        [(index, monster)] => {
            send_in(ctx, session, *index, monster)?;
            session.log.push(BattleEvent::AutoSubstituted {
                name: session.you.display_name(),
            });
            Ok(TurnStatus::Ongoing)
        }
        // Only capture or finish remain once the enemy is down.
        _ if session.allow_capture => Ok(TurnStatus::Ongoing),
        _ => {
            session.require_switch = true;
            session.log.push(BattleEvent::ChooseReplacement);
            Ok(TurnStatus::Ongoing)
        }
    }
}

/// Effect and bonus codes across the enemy's whole loadout.
fn enemy_codes(ctx: &BattleContext, enemy: &Combatant) -> BattleResult<(BTreeSet<String>, BTreeSet<String>)> {
    let mut effects = BTreeSet::new();
    let mut bonuses = BTreeSet::new();
    for slot in &enemy.moves {
        let record = ctx.content.move_by_id(slot.move_id)?;
        effects.extend(record.stack_effects.iter().cloned());
        bonuses.extend(record.stack_bonuses.iter().cloned());
    }
    Ok((effects, bonuses))
}

/// Open capture, feed the learn list and award XP to the active monster.
fn on_enemy_defeated(ctx: &BattleContext, session: &mut BattleSession, rng: &mut TurnRng) -> BattleResult<()> {
    session.log.push(BattleEvent::Fainted {
        name: session.enemy.display_name(),
    });
    session.allow_capture = true;

    let Some(id) = session.you.monster_id else {
        return Ok(());
    };
    let mut monster = ctx.party.monster(id)?;
    let (effects, bonuses) = enemy_codes(ctx, &session.enemy)?;
    monster
        .learn_list
        .record(TraitKind::Effect, effects.iter().map(String::as_str), &monster.learned_pool);
    monster
        .learn_list
        .record(TraitKind::Bonus, bonuses.iter().map(String::as_str), &monster.learned_pool);

    let species = ctx.species.by_id(monster.species_id)?;
    let award = progression::award_xp(
        ctx.party,
        monster,
        &species.base_stats,
        session.enemy.level,
        &session.you.display_name(),
        rng,
    )?;

    session.you.level = award.monster.level;
    session.you.hp = award.monster.hp;
    session.you.max_hp = award.monster.max_hp;
    session.log.extend(award.events);
    Ok(())
}
