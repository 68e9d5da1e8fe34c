//! Party operations outside of battle: move-slot edits, healing, release and
//! starters.

use crate::battle::state::TurnRng;
use crate::battle::stats;
use crate::content::ContentRegistry;
use crate::errors::{BattleError, BattleResult, ContentError, StoreError};
use crate::monster::{roll_growth, Monster, MonsterId, MoveSlot, MAX_MOVE_SLOTS};
use crate::species::SpeciesStore;
use crate::stack::validate_stack;
use crate::store::{MonsterPatch, NewMonster, PartyStore, PlayerId};
use schema::SpeciesId;

fn owned(party: &dyn PartyStore, player: &PlayerId, id: MonsterId) -> BattleResult<Monster> {
    let monster = party.monster(id)?;
    if &monster.owner != player {
        return Err(StoreError::NotOwner {
            player: player.clone(),
            monster: id,
        }
        .into());
    }
    Ok(monster)
}

/// Recompose one move slot from a proposed effect stack and bonus set.
///
/// The stack is sanitized, canonicalized and written to `slot`. Current PP is
/// clamped down to the new move's max but never raised. Writing to the slot
/// just past the end adds a new, fully charged move while fewer than four
/// are equipped.
pub fn edit_move_slot(
    content: &ContentRegistry,
    party: &dyn PartyStore,
    player: &PlayerId,
    id: MonsterId,
    slot: usize,
    effects: &[String],
    bonuses: &[String],
) -> BattleResult<Monster> {
    let monster = owned(party, player, id)?;
    let validated = validate_stack(content, effects, bonuses)?;
    let record = content.ensure_move(&validated.effects, &validated.bonuses)?;
    let max_pp = content.max_pp_for_stack(&record.stack_effects);

    let mut moves = monster.moves;
    if let Some(existing) = moves.get_mut(slot) {
        existing.move_id = record.id;
        existing.clamp_pp(max_pp);
    } else if slot == moves.len() && moves.len() < MAX_MOVE_SLOTS {
        moves.push(MoveSlot::new(record.id, max_pp));
    } else {
        return Err(BattleError::BadMoveReference(slot));
    }

    tracing::info!("{:?} slot {} now holds '{}'", id, slot, record.name);
    Ok(party.mutate(
        id,
        MonsterPatch {
            moves: Some(moves),
            ..Default::default()
        },
    )?)
}

/// Restore every party member to full HP and every slot to full PP.
pub fn heal_party(content: &ContentRegistry, party: &dyn PartyStore, player: &PlayerId) -> BattleResult<Vec<Monster>> {
    let members = party.get(player)?;
    let mut healed = Vec::with_capacity(members.len());
    for monster in members {
        let mut moves = monster.moves.clone();
        for slot in &mut moves {
            let record = content.move_by_id(slot.move_id)?;
            slot.current_pp = content.max_pp_for_stack(&record.stack_effects);
        }
        healed.push(party.mutate(
            monster.id,
            MonsterPatch {
                hp: Some(monster.max_hp),
                moves: Some(moves),
                ..Default::default()
            },
        )?);
    }
    tracing::info!("Healed {} monster(s) for {}", healed.len(), player);
    Ok(healed)
}

/// Delete an owned monster.
pub fn release(party: &dyn PartyStore, player: &PlayerId, id: MonsterId) -> BattleResult<()> {
    owned(party, player, id)?;
    party.delete(id)?;
    tracing::info!("{} released {:?}", player, id);
    Ok(())
}

/// Create a starter with a fresh growth roll, full HP and one move built on
/// the first base effect in the registry.
pub fn create_starter(
    content: &ContentRegistry,
    species: &dyn SpeciesStore,
    party: &dyn PartyStore,
    player: &PlayerId,
    species_id: SpeciesId,
    level: u32,
    rng: &mut TurnRng,
) -> BattleResult<Monster> {
    let data = species.by_id(species_id)?;
    let base = content
        .base_effects()
        .first()
        .map(|e| e.code.clone())
        .ok_or(ContentError::NoBaseEffects)?;
    let record = content.ensure_move(&[base], &[])?;

    let growth = roll_growth(rng);
    let level = level.max(1);
    let max_hp = stats::derive(&data.base_stats, &growth, level).hp;
    let new = NewMonster {
        species_id,
        nickname: None,
        level,
        hp: max_hp,
        max_hp,
        growth,
        moves: vec![MoveSlot::new(record.id, content.max_pp_for_stack(&record.stack_effects))],
    };
    Ok(party.create(player, new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{TestHarness, TestMonsterBuilder};
    use pretty_assertions::assert_eq;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_edit_replaces_slot_and_clamps_pp_down() {
        let harness = TestHarness::new();
        // dmg_phys has 25 PP; dmg_mag has 15.
        let monster = harness.add_monster(TestMonsterBuilder::new(1, 3).with_moves(vec![harness.slot(&["dmg_phys"])]));

        let edited = edit_move_slot(
            &harness.content,
            harness.party.as_ref(),
            &harness.player,
            monster.id,
            0,
            &codes(&["stun", "dmg_mag"]),
            &codes(&["accuracy_up"]),
        )
        .unwrap();

        let record = harness.content.move_by_id(edited.moves[0].move_id).unwrap();
        assert_eq!(record.stack_effects, codes(&["dmg_mag", "stun"]));
        assert_eq!(edited.moves[0].current_pp, 15);
    }

    #[test]
    fn test_edit_never_raises_pp() {
        let harness = TestHarness::new();
        let mut slot = harness.slot(&["dmg_mag"]);
        slot.current_pp = 3;
        let monster = harness.add_monster(TestMonsterBuilder::new(1, 3).with_moves(vec![slot]));

        let edited = edit_move_slot(
            &harness.content,
            harness.party.as_ref(),
            &harness.player,
            monster.id,
            0,
            &codes(&["dmg_phys"]),
            &[],
        )
        .unwrap();
        assert_eq!(edited.moves[0].current_pp, 3);
    }

    #[test]
    fn test_edit_appends_and_rejects_gaps() {
        let harness = TestHarness::new();
        let monster = harness.add_monster(TestMonsterBuilder::new(1, 3).with_moves(vec![harness.slot(&["dmg_phys"])]));
        let edit = |slot| {
            edit_move_slot(
                &harness.content,
                harness.party.as_ref(),
                &harness.player,
                monster.id,
                slot,
                &codes(&["dmg_phys", "stun"]),
                &[],
            )
        };

        assert_eq!(edit(2), Err(BattleError::BadMoveReference(2)));
        let edited = edit(1).unwrap();
        assert_eq!(edited.moves.len(), 2);
        assert_eq!(edited.moves[1].current_pp, 25);
    }

    #[test]
    fn test_edit_without_base_leaves_slot_alone() {
        let harness = TestHarness::new();
        let monster = harness.add_monster(TestMonsterBuilder::new(1, 3).with_moves(vec![harness.slot(&["dmg_phys"])]));

        let result = edit_move_slot(
            &harness.content,
            harness.party.as_ref(),
            &harness.player,
            monster.id,
            0,
            &codes(&["stun"]),
            &[],
        );

        assert!(matches!(result, Err(BattleError::InvalidStack(_))));
        assert_eq!(harness.party.monster(monster.id).unwrap().moves, monster.moves);
    }

    #[test]
    fn test_heal_restores_hp_and_pp() {
        let harness = TestHarness::new();
        let mut slot = harness.slot(&["dmg_phys"]);
        slot.current_pp = 0;
        let monster = harness.add_monster(TestMonsterBuilder::new(1, 3).with_hp(0).with_moves(vec![slot]));

        let healed = heal_party(&harness.content, harness.party.as_ref(), &harness.player).unwrap();

        assert_eq!(healed[0].hp, monster.max_hp);
        assert_eq!(healed[0].moves[0].current_pp, 25);
    }

    #[test]
    fn test_release_checks_owner() {
        let harness = TestHarness::new();
        let monster = harness.add_monster(TestMonsterBuilder::new(1, 3));
        let stranger = PlayerId::new("gary");

        assert_eq!(
            release(harness.party.as_ref(), &stranger, monster.id),
            Err(BattleError::Store(StoreError::NotOwner {
                player: stranger.clone(),
                monster: monster.id,
            }))
        );
        release(harness.party.as_ref(), &harness.player, monster.id).unwrap();
        assert!(harness.party().is_empty());
    }

    #[test]
    fn test_create_starter() {
        let harness = TestHarness::new();
        let mut rng = TurnRng::new_for_test(vec![50; 8]);

        let starter = create_starter(
            &harness.content,
            harness.species.as_ref(),
            harness.party.as_ref(),
            &harness.player,
            SpeciesId(4),
            5,
            &mut rng,
        )
        .unwrap();

        assert_eq!(starter.level, 5);
        assert_eq!(starter.hp, starter.max_hp);
        assert_eq!(starter.moves.len(), 1);
        let record = harness.content.move_by_id(starter.moves[0].move_id).unwrap();
        assert_eq!(record.stack_effects, codes(&["dmg_phys"]));
        assert_eq!(harness.party().len(), 1);
    }
}
