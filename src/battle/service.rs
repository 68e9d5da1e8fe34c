//! Keyed store of in-progress battles, one per player.
//!
//! The outer `RwLock` only guards the map. Each battle sits behind its own
//! `Mutex`, so turns for one player are serialized while different players
//! run in parallel.

use crate::battle::engine::{self, BattleContext, BattleOutcome, TurnAction, TurnStatus};
use crate::battle::state::{BattleSession, Combatant, TurnRng};
use crate::config::EngineConfig;
use crate::content::ContentRegistry;
use crate::errors::{BattleError, BattleResult, StoreError};
use crate::species::SpeciesStore;
use crate::store::{PartyStore, PlayerId, WorldStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// PP of one of the active monster's slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpEntry {
    pub slot: usize,
    pub name: String,
    pub current: u8,
    pub max: u8,
}

/// What a caller sees of an open battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleView {
    pub you: Combatant,
    pub you_index: usize,
    pub enemy: Combatant,
    pub pp: Vec<PpEntry>,
    pub log: Vec<String>,
    pub allow_capture: bool,
    pub require_switch: bool,
    pub turn_number: u32,
}

impl BattleView {
    pub fn from_session(session: &BattleSession, content: &ContentRegistry) -> BattleResult<Self> {
        let mut pp = Vec::with_capacity(session.you.moves.len());
        for (slot, move_slot) in session.you.moves.iter().enumerate() {
            let record = content.move_by_id(move_slot.move_id)?;
            pp.push(PpEntry {
                slot,
                name: move_slot.name_custom.clone().unwrap_or_else(|| record.name.clone()),
                current: move_slot.current_pp,
                max: content.max_pp_for_stack(&record.stack_effects),
            });
        }
        Ok(Self {
            you: session.you.clone(),
            you_index: session.you_index,
            enemy: session.enemy.clone(),
            pp,
            log: session.log.lines(),
            allow_capture: session.allow_capture,
            require_switch: session.require_switch,
            turn_number: session.turn_number,
        })
    }
}

/// Result of an operation on an open battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnResult {
    Ongoing(BattleView),
    Ended { outcome: BattleOutcome, log: Vec<String> },
}

struct ActiveBattle {
    session: BattleSession,
    rng: TurnRng,
    last_active: Instant,
    /// Set once the battle reached a terminal state, for callers that still
    /// hold the handle after it was removed from the map.
    closed: bool,
}

pub struct BattleService {
    config: EngineConfig,
    content: Arc<ContentRegistry>,
    species: Arc<dyn SpeciesStore>,
    party: Arc<dyn PartyStore>,
    world: Arc<dyn WorldStore>,
    sessions: RwLock<HashMap<PlayerId, Arc<Mutex<ActiveBattle>>>>,
    battles_started: AtomicU64,
}

impl fmt::Debug for BattleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleService")
            .field("config", &self.config)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

fn poisoned<E: fmt::Display>(err: E) -> BattleError {
    tracing::error!("Battle session lock poisoned: {}", err);
    BattleError::Store(StoreError::Poisoned(err.to_string()))
}

impl BattleService {
    pub fn new(
        config: EngineConfig,
        content: Arc<ContentRegistry>,
        species: Arc<dyn SpeciesStore>,
        party: Arc<dyn PartyStore>,
        world: Arc<dyn WorldStore>,
    ) -> Self {
        Self {
            config,
            content,
            species,
            party,
            world,
            sessions: RwLock::new(HashMap::new()),
            battles_started: AtomicU64::new(0),
        }
    }

    fn context(&self) -> BattleContext<'_> {
        BattleContext {
            content: self.content.as_ref(),
            species: self.species.as_ref(),
            party: self.party.as_ref(),
            world: self.world.as_ref(),
        }
    }

    fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.config.session_idle_ttl_secs)
    }

    /// Seeded from config when a seed is set (offset per battle), otherwise from the OS.
    fn next_rng(&self) -> TurnRng {
        let count = self.battles_started.fetch_add(1, Ordering::Relaxed);
        match self.config.rng_seed {
            Some(seed) => TurnRng::from_seed(seed.wrapping_add(count)),
            None => TurnRng::new_random(),
        }
    }

    /// Start a wild battle, discarding any battle the player already had open.
    pub fn start_battle(&self, player: &PlayerId) -> BattleResult<BattleView> {
        let rng = self.next_rng();
        self.start_battle_with_rng(player, rng)
    }

    /// Like [`start_battle`](Self::start_battle) with a caller-supplied RNG that
    /// drives every roll of the new battle.
    pub fn start_battle_with_rng(&self, player: &PlayerId, mut rng: TurnRng) -> BattleResult<BattleView> {
        // The old battle is gone even if the new one fails to start.
        if let Some(stale) = self.remove(player)? {
            if let Ok(mut stale) = stale.lock() {
                stale.closed = true;
            }
            tracing::info!("Discarded stale battle for {}", player);
        }

        let session = engine::start_battle(&self.context(), player, self.config.wild_level_spread, &mut rng)?;
        let view = BattleView::from_session(&session, &self.content)?;

        let battle = ActiveBattle {
            session,
            rng,
            last_active: Instant::now(),
            closed: false,
        };
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(player.clone(), Arc::new(Mutex::new(battle)));
        Ok(view)
    }

    pub fn submit_turn(&self, player: &PlayerId, action: TurnAction) -> BattleResult<TurnResult> {
        self.with_battle(player, |ctx, session, rng| engine::submit_turn(ctx, session, action, rng))
    }

    pub fn attempt_capture(&self, player: &PlayerId) -> BattleResult<TurnResult> {
        self.with_battle(player, |ctx, session, rng| engine::attempt_capture(ctx, session, rng))
    }

    /// Close whatever battle the player has open. Always succeeds.
    pub fn finish_battle(&self, player: &PlayerId) -> BattleResult<BattleOutcome> {
        if let Some(handle) = self.remove(player)? {
            if let Ok(mut battle) = handle.lock() {
                battle.closed = true;
            }
            tracing::info!("{} finished their battle", player);
        }
        Ok(BattleOutcome::Finished)
    }

    /// The current view of an open battle.
    pub fn view(&self, player: &PlayerId) -> BattleResult<BattleView> {
        let handle = self.handle(player)?;
        let mut battle = handle.lock().map_err(poisoned)?;
        self.check_live(player, &battle)?;
        battle.last_active = Instant::now();
        BattleView::from_session(&battle.session, &self.content)
    }

    pub fn has_battle(&self, player: &PlayerId) -> bool {
        self.view(player).is_ok()
    }

    /// Drop every battle idle for longer than the configured TTL. Returns how
    /// many were removed.
    pub fn sweep_expired(&self) -> BattleResult<usize> {
        let ttl = self.idle_ttl();
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|player, handle| match handle.try_lock() {
            Ok(battle) => {
                let keep = !battle.closed && battle.last_active.elapsed() < ttl;
                if !keep {
                    tracing::info!("Expired idle battle for {}", player);
                }
                keep
            }
            // Busy with a turn right now, so not idle.
            Err(_) => true,
        });
        Ok(before - sessions.len())
    }

    fn handle(&self, player: &PlayerId) -> BattleResult<Arc<Mutex<ActiveBattle>>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        sessions.get(player).cloned().ok_or(BattleError::NoActiveBattle)
    }

    fn remove(&self, player: &PlayerId) -> BattleResult<Option<Arc<Mutex<ActiveBattle>>>> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        Ok(sessions.remove(player))
    }

    fn check_live(&self, player: &PlayerId, battle: &ActiveBattle) -> BattleResult<()> {
        if battle.closed {
            return Err(BattleError::NoActiveBattle);
        }
        if battle.last_active.elapsed() >= self.idle_ttl() {
            tracing::info!("Battle for {} expired after being idle", player);
            return Err(BattleError::NoActiveBattle);
        }
        Ok(())
    }

    /// Run `op` against the player's battle under its lock and turn the
    /// engine status into a view or a terminal result.
    ///
    /// `op` works on a copy of the session and RNG that is only kept when it
    /// succeeds, so a failed operation leaves the battle as it was.
    fn with_battle<F>(&self, player: &PlayerId, op: F) -> BattleResult<TurnResult>
    where
        F: FnOnce(&BattleContext, &mut BattleSession, &mut TurnRng) -> BattleResult<TurnStatus>,
    {
        let handle = self.handle(player)?;
        let mut battle = handle.lock().map_err(poisoned)?;
        if let Err(err) = self.check_live(player, &battle) {
            drop(battle);
            self.remove_if_same(player, &handle)?;
            return Err(err);
        }
        battle.last_active = Instant::now();

        let mut session = battle.session.clone();
        let mut rng = battle.rng.clone();
        let status = op(&self.context(), &mut session, &mut rng)?;
        battle.session = session;
        battle.rng = rng;
        match status {
            TurnStatus::Ongoing => Ok(TurnResult::Ongoing(BattleView::from_session(
                &battle.session,
                &self.content,
            )?)),
            TurnStatus::Ended(outcome) => {
                battle.closed = true;
                let log = battle.session.log.lines();
                drop(battle);
                self.remove_if_same(player, &handle)?;
                Ok(TurnResult::Ended { outcome, log })
            }
        }
    }

    /// Remove the player's entry only if it is still `handle`; a newer battle
    /// started in the meantime stays.
    fn remove_if_same(&self, player: &PlayerId, handle: &Arc<Mutex<ActiveBattle>>) -> BattleResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        if sessions.get(player).is_some_and(|current| Arc::ptr_eq(current, handle)) {
            sessions.remove(player);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::{TestHarness, TestMonsterBuilder};
    use crate::errors::StoreResult;
    use crate::monster::{Monster, MonsterId};
    use crate::store::{InMemoryPartyStore, MonsterPatch, NewMonster};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicBool;

    fn harness_with_starter() -> TestHarness {
        let harness = TestHarness::new();
        let tackle = harness.slot(&["dmg_phys"]);
        harness.add_monster(TestMonsterBuilder::new(1, 5).with_moves(vec![tackle]));
        harness
    }

    #[test]
    fn test_operations_without_battle_fail() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig::default());
        let player = harness.player.clone();

        assert_eq!(service.view(&player), Err(BattleError::NoActiveBattle));
        assert_eq!(
            service.submit_turn(&player, TurnAction::Run),
            Err(BattleError::NoActiveBattle)
        );
        assert_eq!(service.attempt_capture(&player), Err(BattleError::NoActiveBattle));
        assert_eq!(service.finish_battle(&player), Ok(BattleOutcome::Finished));
    }

    #[test]
    fn test_start_and_view() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig {
            rng_seed: Some(7),
            ..EngineConfig::default()
        });
        let player = harness.player.clone();

        let view = service.start_battle(&player).unwrap();
        assert_eq!(view.you_index, 0);
        assert_eq!(view.pp.len(), 1);
        assert_eq!(view.pp[0].current, 25);
        assert_eq!(view.pp[0].max, 25);
        assert!(!view.allow_capture);
        assert!(view.log[0].starts_with("A wild "));
        assert_eq!(service.view(&player).unwrap(), view);
    }

    #[test]
    fn test_finish_destroys_the_battle() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig::default());
        let player = harness.player.clone();

        service.start_battle(&player).unwrap();
        assert!(service.has_battle(&player));
        assert_eq!(service.finish_battle(&player), Ok(BattleOutcome::Finished));
        assert!(!service.has_battle(&player));
    }

    #[test]
    fn test_escape_ends_and_removes() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig::default());
        let player = harness.player.clone();

        // Species pick, wild level, loadout size, base effect, extra and
        // bonus rolls all read 1; the escape roll reads 1 as well.
        service
            .start_battle_with_rng(&player, TurnRng::new_for_test(vec![1; 20]))
            .unwrap();
        let result = service.submit_turn(&player, TurnAction::Run).unwrap();

        match result {
            TurnResult::Ended { outcome, log } => {
                assert_eq!(outcome, BattleOutcome::Escaped);
                assert_eq!(log.last().map(String::as_str), Some("Got away safely!"));
            }
            other => panic!("expected the battle to end, got {:?}", other),
        }
        assert_eq!(service.view(&player), Err(BattleError::NoActiveBattle));
    }

    #[test]
    fn test_restart_discards_stale_battle() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig {
            rng_seed: Some(1),
            ..EngineConfig::default()
        });
        let player = harness.player.clone();

        service.start_battle(&player).unwrap();
        service.start_battle(&player).unwrap();
        let view = service.view(&player).unwrap();
        assert_eq!(view.turn_number, 1);
        assert_eq!(service.sweep_expired().unwrap(), 0);
    }

    #[test]
    fn test_idle_battles_expire() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig {
            session_idle_ttl_secs: 0,
            rng_seed: Some(3),
            ..EngineConfig::default()
        });
        let player = harness.player.clone();

        service.start_battle(&player).unwrap();
        assert_eq!(service.view(&player), Err(BattleError::NoActiveBattle));
        assert_eq!(service.sweep_expired().unwrap(), 1);
        assert_eq!(service.sweep_expired().unwrap(), 0);
    }

    #[test]
    fn test_fainted_party_cannot_start() {
        let harness = TestHarness::new();
        harness.add_monster(TestMonsterBuilder::new(1, 5).with_hp(0));
        let service = harness.service(EngineConfig::default());
        assert_eq!(service.start_battle(&harness.player), Err(BattleError::YouFainted));
        assert!(!service.has_battle(&harness.player));
    }

    #[test]
    fn test_failed_restart_still_discards_old_battle() {
        let harness = harness_with_starter();
        let service = harness.service(EngineConfig {
            rng_seed: Some(5),
            ..EngineConfig::default()
        });
        let player = harness.player.clone();
        service.start_battle(&player).unwrap();

        let lead = harness.party()[0].id;
        harness
            .party
            .mutate(
                lead,
                MonsterPatch {
                    hp: Some(0),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(service.start_battle(&player), Err(BattleError::YouFainted));
        assert_eq!(service.view(&player), Err(BattleError::NoActiveBattle));
        assert_eq!(
            service.submit_turn(&player, TurnAction::Run),
            Err(BattleError::NoActiveBattle)
        );
    }

    /// A party store whose writes can be switched off.
    struct ReadOnlyPartyStore {
        inner: Arc<InMemoryPartyStore>,
        refuse_writes: AtomicBool,
    }

    impl PartyStore for ReadOnlyPartyStore {
        fn get(&self, player: &PlayerId) -> StoreResult<Vec<Monster>> {
            self.inner.get(player)
        }

        fn monster(&self, id: MonsterId) -> StoreResult<Monster> {
            self.inner.monster(id)
        }

        fn mutate(&self, id: MonsterId, patch: MonsterPatch) -> StoreResult<Monster> {
            if self.refuse_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Poisoned("writes refused".to_string()));
            }
            self.inner.mutate(id, patch)
        }

        fn create(&self, player: &PlayerId, monster: NewMonster) -> StoreResult<Monster> {
            self.inner.create(player, monster)
        }

        fn delete(&self, id: MonsterId) -> StoreResult<()> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn test_failed_write_leaves_battle_unchanged() {
        let harness = harness_with_starter();
        let party = Arc::new(ReadOnlyPartyStore {
            inner: harness.party.clone(),
            refuse_writes: AtomicBool::new(false),
        });
        let service = BattleService::new(
            EngineConfig {
                rng_seed: Some(11),
                ..EngineConfig::default()
            },
            Arc::clone(&harness.content),
            harness.species.clone(),
            party.clone(),
            harness.world.clone(),
        );
        let player = harness.player.clone();
        let before = service.start_battle(&player).unwrap();

        party.refuse_writes.store(true, Ordering::SeqCst);
        let result = service.submit_turn(&player, TurnAction::Move { slot: 0 });
        assert!(matches!(result, Err(BattleError::Store(StoreError::Poisoned(_)))));
        assert_eq!(service.view(&player).unwrap(), before);

        party.refuse_writes.store(false, Ordering::SeqCst);
        let after = match service.submit_turn(&player, TurnAction::Move { slot: 0 }).unwrap() {
            TurnResult::Ongoing(view) => view,
            other => panic!("expected the battle to continue, got {:?}", other),
        };
        assert_eq!(after.pp[0].current, 24);
    }

    #[test]
    fn test_turn_action_wire_shape() {
        let action: TurnAction = serde_json::from_str(r#"{"action":"switch","index":2}"#).unwrap();
        assert_eq!(action, TurnAction::Switch { index: 2 });
        let outcome = serde_json::to_string(&BattleOutcome::TeamWiped).unwrap();
        assert_eq!(outcome, r#""you_team_wiped""#);
    }
}
