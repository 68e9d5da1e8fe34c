use crate::battle::engine::{self, BattleContext, TurnAction, TurnStatus};
use crate::battle::service::BattleService;
use crate::battle::state::{BattleEvent, BattleSession, Combatant, Side, TurnRng};
use crate::battle::stats;
use crate::config::EngineConfig;
use crate::content::{ContentRegistry, MoveId};
use crate::errors::BattleResult;
use crate::monster::{Monster, MoveSlot};
use crate::species::{InMemorySpeciesStore, SpeciesStore};
use crate::store::{InMemoryPartyStore, InMemoryWorldStore, NewMonster, PartyStore, PlayerId};
use schema::{
    neutral_growth, Biome, Bonus, BonusValueType, Effect, EffectTarget, EffectType, NamedMove,
    SpeciesData, SpeciesId, StatBlock,
};
use std::sync::Arc;

fn effect(
    code: &str,
    target: EffectTarget,
    effect_type: EffectType,
    stat: &str,
    amount: Option<f64>,
) -> Effect {
    Effect {
        code: code.to_string(),
        target,
        accuracy: None,
        effect_type,
        stat: stat.to_string(),
        amount,
        base_flag_eligible: false,
        base_pp: None,
        priority: 0,
    }
}

/// The effect rows behind [`test_content`]. Push extra rows and call
/// `ContentRegistry::from_parts` for content a single test needs.
pub fn test_effects() -> Vec<Effect> {
    let mut dmg_phys = effect("dmg_phys", EffectTarget::Target, EffectType::Damage, "PHY", Some(10.0));
    dmg_phys.base_flag_eligible = true;
    dmg_phys.base_pp = Some(25);

    let mut dmg_mag = effect("dmg_mag", EffectTarget::Target, EffectType::Damage, "MAG", Some(12.0));
    dmg_mag.base_flag_eligible = true;
    dmg_mag.base_pp = Some(15);

    let mut stun = effect("stun", EffectTarget::Target, EffectType::Status, "Stun", None);
    stun.accuracy = Some(0.9);

    vec![
        dmg_phys,
        stun,
        effect("buff_phy", EffectTarget::User, EffectType::StatChange, "PHY", Some(0.2)),
        dmg_mag,
        effect("weaken_def", EffectTarget::Target, EffectType::StatChange, "DEF", Some(-0.1)),
        effect(
            "glimmer",
            EffectTarget::Target,
            EffectType::Custom("sparkle".to_string()),
            "",
            None,
        ),
    ]
}

pub fn test_bonuses() -> Vec<Bonus> {
    vec![
        Bonus {
            code: "accuracy_up".to_string(),
            value_type: BonusValueType::Flat,
            value: 0.1,
        },
        Bonus {
            code: "high_crit".to_string(),
            value_type: BonusValueType::Tag,
            value: 0.0,
        },
    ]
}

/// Small content set: two base damage effects, a status, stat changes, a
/// custom effect, two bonuses and one named move ("Arcane Bolt" = dmg_mag).
pub fn test_content() -> ContentRegistry {
    let named = vec![NamedMove {
        name: "Arcane Bolt".to_string(),
        stack_effects: vec!["dmg_mag".to_string()],
        stack_bonuses: vec![],
        power: None,
        accuracy: None,
    }];
    ContentRegistry::from_parts(test_effects(), test_bonuses(), named)
}

fn species(id: u32, name: &str, base: u16, biomes: Vec<Biome>, spawn_rate: f64) -> SpeciesData {
    SpeciesData {
        id: SpeciesId(id),
        name: name.to_string(),
        base_stats: StatBlock::splat(base),
        biomes,
        types: vec![],
        spawn_rate,
    }
}

pub fn test_species_store() -> InMemorySpeciesStore {
    InMemorySpeciesStore::new(vec![
        species(1, "Sproutle", 50, vec![Biome::Grassland, Biome::Forest], 0.14),
        species(2, "Finnow", 40, vec![Biome::River, Biome::Ocean], 0.10),
        species(4, "Pebblin", 60, vec![Biome::Mountain, Biome::Grassland], 0.08),
    ])
}

/// Builds battle snapshots without going through a party store.
///
/// Defaults: species Sproutle (#1), flat base 50, level 5, neutral growth,
/// full hp, no moves, no status.
pub struct CombatantBuilder {
    side: Side,
    base: u16,
    level: u32,
    hp: Option<u32>,
    status: Option<String>,
    moves: Vec<MoveSlot>,
    nickname: Option<String>,
}

impl CombatantBuilder {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            base: 50,
            level: 5,
            hp: None,
            status: None,
            moves: vec![],
            nickname: None,
        }
    }

    pub fn with_base(mut self, base: u16) -> Self {
        self.base = base;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Sets current hp; max hp is raised to match when needed.
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_moves(mut self, moves: Vec<MoveSlot>) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_nickname(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }

    pub fn build(self) -> Combatant {
        let base_stats = StatBlock::splat(self.base);
        let growth = neutral_growth();
        let derived_hp = stats::derive(&base_stats, &growth, self.level).hp;
        let hp = self.hp.unwrap_or(derived_hp);
        Combatant {
            side: self.side,
            monster_id: None,
            species_id: SpeciesId(1),
            species_name: "Sproutle".to_string(),
            nickname: self.nickname,
            level: self.level,
            hp,
            max_hp: derived_hp.max(hp),
            growth,
            base_stats,
            moves: self.moves,
            status: self.status,
        }
    }
}

/// Builds party rows for [`TestHarness::add_monster`].
pub struct TestMonsterBuilder {
    species_id: SpeciesId,
    level: u32,
    hp: Option<u32>,
    moves: Vec<MoveSlot>,
    nickname: Option<String>,
}

impl TestMonsterBuilder {
    pub fn new(species_id: u32, level: u32) -> Self {
        Self {
            species_id: SpeciesId(species_id),
            level,
            hp: None,
            moves: vec![],
            nickname: None,
        }
    }

    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn with_moves(mut self, moves: Vec<MoveSlot>) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_nickname(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }
}

/// Content, stores and one player, wired the way the service wires them.
pub struct TestHarness {
    pub content: Arc<ContentRegistry>,
    pub species: Arc<InMemorySpeciesStore>,
    pub party: Arc<InMemoryPartyStore>,
    pub world: Arc<InMemoryWorldStore>,
    pub player: PlayerId,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_content(test_content())
    }

    pub fn with_content(content: ContentRegistry) -> Self {
        Self {
            content: Arc::new(content),
            species: Arc::new(test_species_store()),
            party: Arc::new(InMemoryPartyStore::new()),
            world: Arc::new(InMemoryWorldStore::new()),
            player: PlayerId::new("ash"),
        }
    }

    pub fn context(&self) -> BattleContext<'_> {
        BattleContext {
            content: self.content.as_ref(),
            species: self.species.as_ref(),
            party: self.party.as_ref(),
            world: self.world.as_ref(),
        }
    }

    pub fn service(&self, config: EngineConfig) -> BattleService {
        BattleService::new(
            config,
            Arc::clone(&self.content),
            self.species.clone(),
            self.party.clone(),
            self.world.clone(),
        )
    }

    /// A full-PP slot for the canonical move of `stack`.
    pub fn slot(&self, stack: &[&str]) -> MoveSlot {
        let effects: Vec<String> = stack.iter().map(|s| s.to_string()).collect();
        let record = assert_ok(self.content.ensure_move(&effects, &[]).map_err(Into::into));
        MoveSlot::new(record.id, self.content.max_pp_for_stack(&record.stack_effects))
    }

    pub fn move_id(&self, stack: &[&str]) -> MoveId {
        self.slot(stack).move_id
    }

    pub fn add_monster(&self, builder: TestMonsterBuilder) -> Monster {
        let growth = neutral_growth();
        let species = assert_ok(self.species.by_id(builder.species_id).map_err(Into::into));
        let max_hp = stats::derive(&species.base_stats, &growth, builder.level).hp;
        let hp = builder.hp.unwrap_or(max_hp);
        let new = NewMonster {
            species_id: builder.species_id,
            nickname: builder.nickname,
            level: builder.level,
            hp,
            max_hp: max_hp.max(hp),
            growth,
            moves: builder.moves,
        };
        assert_ok(self.party.create(&self.player, new).map_err(Into::into))
    }

    pub fn party(&self) -> Vec<Monster> {
        assert_ok(self.party.get(&self.player).map_err(Into::into))
    }

    /// Open a battle against `enemy` with the current party.
    pub fn begin(&self, enemy: Combatant) -> BattleSession {
        assert_ok(engine::begin_battle(&self.context(), &self.player, enemy))
    }

    pub fn submit(&self, session: &mut BattleSession, action: TurnAction, rng: &mut TurnRng) -> BattleResult<TurnStatus> {
        engine::submit_turn(&self.context(), session, action, rng)
    }
}

/// A wild Sproutle carrying the canonical move for `stack` in its first slot.
pub fn wild_enemy(harness: &TestHarness, level: u32, stack: &[&str]) -> CombatantBuilder {
    CombatantBuilder::new(Side::Enemy)
        .with_level(level)
        .with_moves(vec![harness.slot(stack)])
}

/// Events of one variant, in log order.
pub fn events_matching(session: &BattleSession, predicate: impl Fn(&BattleEvent) -> bool) -> Vec<BattleEvent> {
    session.log.events().iter().filter(|e| predicate(e)).cloned().collect()
}

/// Who used a move, in order.
pub fn move_users(session: &BattleSession) -> Vec<String> {
    session
        .log
        .events()
        .iter()
        .filter_map(|e| match e {
            BattleEvent::MoveUsed { user, .. } => Some(user.clone()),
            _ => None,
        })
        .collect()
}

/// Creates a `TurnRng` instance with a long list of default values (50).
/// Useful for tests where the specific RNG outcome is not important.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![50; 100])
}

/// Assert that a Result is Ok and return the value.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}
