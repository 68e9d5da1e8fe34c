//! Collaborator interfaces the battle core persists through, with in-memory
//! implementations for tests and the demo binary.

use crate::errors::{StoreError, StoreResult};
use crate::monster::{LearnList, LearnedPool, Monster, MonsterId, MoveSlot};
use schema::{Biome, Growth, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Opaque authenticated-player identity handed over by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields to overwrite on one monster row. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonsterPatch {
    pub level: Option<u32>,
    pub xp: Option<u32>,
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
    pub moves: Option<Vec<MoveSlot>>,
    pub learned_pool: Option<LearnedPool>,
    pub learn_list: Option<LearnList>,
}

impl MonsterPatch {
    fn apply(self, monster: &mut Monster) {
        if let Some(level) = self.level {
            monster.level = level;
        }
        if let Some(xp) = self.xp {
            monster.xp = xp;
        }
        if let Some(max_hp) = self.max_hp {
            monster.max_hp = max_hp;
        }
        if let Some(hp) = self.hp {
            monster.hp = hp;
        }
        if let Some(moves) = self.moves {
            monster.moves = moves;
        }
        if let Some(pool) = self.learned_pool {
            monster.learned_pool = pool;
        }
        if let Some(list) = self.learn_list {
            monster.learn_list = list;
        }
    }
}

/// Everything needed to insert a new monster row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMonster {
    pub species_id: SpeciesId,
    pub nickname: Option<String>,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub growth: Growth,
    pub moves: Vec<MoveSlot>,
}

/// Party persistence. Each call is one atomic per-row operation.
pub trait PartyStore: Send + Sync {
    /// The player's monsters in slot order.
    fn get(&self, player: &PlayerId) -> StoreResult<Vec<Monster>>;
    fn monster(&self, id: MonsterId) -> StoreResult<Monster>;
    fn mutate(&self, id: MonsterId, patch: MonsterPatch) -> StoreResult<Monster>;
    fn create(&self, player: &PlayerId, monster: NewMonster) -> StoreResult<Monster>;
    fn delete(&self, id: MonsterId) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct PartyTables {
    monsters: HashMap<MonsterId, Monster>,
    rosters: HashMap<PlayerId, Vec<MonsterId>>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryPartyStore {
    tables: RwLock<PartyTables>,
}

impl InMemoryPartyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: fmt::Display>(err: E) -> StoreError {
    tracing::error!("Party store lock poisoned: {}", err);
    StoreError::Poisoned(err.to_string())
}

impl PartyStore for InMemoryPartyStore {
    fn get(&self, player: &PlayerId) -> StoreResult<Vec<Monster>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .rosters
            .get(player)
            .map(|ids| ids.iter().filter_map(|id| tables.monsters.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn monster(&self, id: MonsterId) -> StoreResult<Monster> {
        let tables = self.tables.read().map_err(poisoned)?;
        tables
            .monsters
            .get(&id)
            .cloned()
            .ok_or(StoreError::MonsterNotFound(id))
    }

    fn mutate(&self, id: MonsterId, patch: MonsterPatch) -> StoreResult<Monster> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let monster = tables
            .monsters
            .get_mut(&id)
            .ok_or(StoreError::MonsterNotFound(id))?;
        patch.apply(monster);
        Ok(monster.clone())
    }

    fn create(&self, player: &PlayerId, new: NewMonster) -> StoreResult<Monster> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.next_id += 1;
        let monster = Monster {
            id: MonsterId(tables.next_id),
            owner: player.clone(),
            species_id: new.species_id,
            nickname: new.nickname,
            level: new.level,
            xp: 0,
            hp: new.hp,
            max_hp: new.max_hp,
            growth: new.growth,
            moves: new.moves,
            learned_pool: LearnedPool::default(),
            learn_list: LearnList::default(),
        };
        tables.monsters.insert(monster.id, monster.clone());
        tables
            .rosters
            .entry(player.clone())
            .or_default()
            .push(monster.id);
        tracing::debug!("Created monster {:?} for {}", monster.id, player);
        Ok(monster)
    }

    fn delete(&self, id: MonsterId) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let monster = tables
            .monsters
            .remove(&id)
            .ok_or(StoreError::MonsterNotFound(id))?;
        if let Some(roster) = tables.rosters.get_mut(&monster.owner) {
            roster.retain(|m| *m != id);
        }
        Ok(())
    }
}

/// The tile a player currently stands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub biome: Biome,
}

pub trait WorldStore: Send + Sync {
    fn current_tile(&self, player: &PlayerId) -> StoreResult<Tile>;
}

/// Per-player tiles; players that never moved stand on grassland.
#[derive(Debug, Default)]
pub struct InMemoryWorldStore {
    tiles: RwLock<HashMap<PlayerId, Tile>>,
}

impl InMemoryWorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tile(&self, player: &PlayerId, tile: Tile) -> StoreResult<()> {
        let mut tiles = self.tiles.write().map_err(poisoned)?;
        tiles.insert(player.clone(), tile);
        Ok(())
    }
}

impl WorldStore for InMemoryWorldStore {
    fn current_tile(&self, player: &PlayerId) -> StoreResult<Tile> {
        let tiles = self.tiles.read().map_err(poisoned)?;
        Ok(tiles.get(player).copied().unwrap_or(Tile {
            biome: Biome::Grassland,
        }))
    }
}
