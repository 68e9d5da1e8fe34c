//! Content registry: effect and bonus lookup tables plus the canonical move table.
//!
//! Effects and bonuses are immutable once loaded. Canonical moves are created
//! lazily the first time a stack is composed and never change afterwards; they
//! are shared behind `Arc` by every monster that equips them.

use crate::errors::{ContentError, ContentResult};
use schema::{Bonus, Effect, NamedMove};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Max PP used when a stack's base effect is unknown or declares none.
pub const FALLBACK_MAX_PP: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoveId(pub u32);

/// A canonical (effect stack, bonus set) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub id: MoveId,
    pub name: String,
    /// Base effect first, the rest de-duplicated and sorted.
    pub stack_effects: Vec<String>,
    /// De-duplicated and sorted.
    pub stack_bonuses: Vec<String>,
    /// Declared power for catalog moves whose effects carry no amount.
    pub power: Option<f64>,
    /// Declared accuracy for catalog moves whose effects carry none.
    pub accuracy: Option<f64>,
}

impl MoveRecord {
    pub fn has_bonus(&self, code: &str) -> bool {
        self.stack_bonuses.iter().any(|b| b == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StackKey {
    effects: Vec<String>,
    bonuses: Vec<String>,
}

#[derive(Debug, Default)]
struct MoveTable {
    by_key: HashMap<StackKey, MoveId>,
    by_id: HashMap<MoveId, Arc<MoveRecord>>,
    next_id: u32,
}

impl MoveTable {
    fn insert(
        &mut self,
        key: StackKey,
        name: String,
        power: Option<f64>,
        accuracy: Option<f64>,
    ) -> Arc<MoveRecord> {
        if let Some(existing) = self.by_key.get(&key).and_then(|id| self.by_id.get(id)) {
            return Arc::clone(existing);
        }
        self.next_id += 1;
        let record = Arc::new(MoveRecord {
            id: MoveId(self.next_id),
            name,
            stack_effects: key.effects.clone(),
            stack_bonuses: key.bonuses.clone(),
            power,
            accuracy,
        });
        tracing::debug!("Registered canonical move {:?} '{}'", record.id, record.name);
        self.by_key.insert(key, record.id);
        self.by_id.insert(record.id, Arc::clone(&record));
        record
    }
}

pub struct ContentRegistry {
    effects: HashMap<String, Effect>,
    effect_order: Vec<String>,
    bonuses: HashMap<String, Bonus>,
    bonus_order: Vec<String>,
    moves: RwLock<MoveTable>,
}

impl std::fmt::Debug for ContentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRegistry")
            .field("effects", &self.effect_order)
            .field("bonuses", &self.bonus_order)
            .finish_non_exhaustive()
    }
}

impl ContentRegistry {
    /// Build a registry from in-memory rows. Duplicate codes keep the first row.
    pub fn from_parts(effects: Vec<Effect>, bonuses: Vec<Bonus>, named: Vec<NamedMove>) -> Self {
        let mut registry = ContentRegistry {
            effects: HashMap::new(),
            effect_order: Vec::new(),
            bonuses: HashMap::new(),
            bonus_order: Vec::new(),
            moves: RwLock::new(MoveTable::default()),
        };

        for effect in effects {
            if registry.effects.contains_key(&effect.code) {
                tracing::warn!("Duplicate effect code '{}' ignored", effect.code);
                continue;
            }
            registry.effect_order.push(effect.code.clone());
            registry.effects.insert(effect.code.clone(), effect);
        }
        for bonus in bonuses {
            if registry.bonuses.contains_key(&bonus.code) {
                tracing::warn!("Duplicate bonus code '{}' ignored", bonus.code);
                continue;
            }
            registry.bonus_order.push(bonus.code.clone());
            registry.bonuses.insert(bonus.code.clone(), bonus);
        }

        // The registry is not shared yet, so the lock cannot be poisoned here.
        let table = registry.moves.get_mut().unwrap_or_else(|e| e.into_inner());
        for row in named {
            let key = normalize(&registry.effects, &row.stack_effects, &row.stack_bonuses);
            if let Some(unknown) = key.effects.iter().find(|c| !registry.effects.contains_key(*c)) {
                tracing::warn!("Named move '{}' references unknown effect '{}'", row.name, unknown);
            }
            table.insert(key, row.name, row.power, row.accuracy);
        }

        registry
    }

    /// Load `effects.ron`, `bonuses.ron` and `moves_named.ron` from `dir`.
    /// A missing file yields an empty table.
    pub fn load(dir: &Path) -> ContentResult<Self> {
        let effects: Vec<Effect> = read_ron_table(&dir.join("effects.ron"))?;
        let bonuses: Vec<Bonus> = read_ron_table(&dir.join("bonuses.ron"))?;
        let named: Vec<NamedMove> = read_ron_table(&dir.join("moves_named.ron"))?;
        tracing::info!(
            "Loaded content: {} effects, {} bonuses, {} named moves",
            effects.len(),
            bonuses.len(),
            named.len()
        );
        Ok(Self::from_parts(effects, bonuses, named))
    }

    pub fn effect_by_code(&self, code: &str) -> Option<&Effect> {
        self.effects.get(code)
    }

    pub fn bonus_by_code(&self, code: &str) -> Option<&Bonus> {
        self.bonuses.get(code)
    }

    /// Base-eligible effects in load order.
    pub fn base_effects(&self) -> Vec<&Effect> {
        self.effects_where(|e| e.base_flag_eligible)
    }

    /// Effects that can only ride along behind a base effect, in load order.
    pub fn extra_effects(&self) -> Vec<&Effect> {
        self.effects_where(|e| !e.base_flag_eligible)
    }

    /// All bonuses in load order.
    pub fn bonuses(&self) -> Vec<&Bonus> {
        self.bonus_order
            .iter()
            .filter_map(|code| self.bonuses.get(code))
            .collect()
    }

    fn effects_where(&self, pred: impl Fn(&Effect) -> bool) -> Vec<&Effect> {
        self.effect_order
            .iter()
            .filter_map(|code| self.effects.get(code))
            .filter(|e| pred(e))
            .collect()
    }

    /// Look up or create the canonical move for a stack.
    ///
    /// Input order does not matter: the stack is normalized (base effect first,
    /// remaining effects and bonuses de-duplicated and sorted) and that key is
    /// upserted under the table's write lock, so concurrent calls with the same
    /// combination get the same id.
    pub fn ensure_move(&self, effects: &[String], bonuses: &[String]) -> ContentResult<Arc<MoveRecord>> {
        let key = normalize(&self.effects, effects, bonuses);
        {
            let table = self
                .moves
                .read()
                .map_err(|e| ContentError::Poisoned(e.to_string()))?;
            if let Some(record) = table.by_key.get(&key).and_then(|id| table.by_id.get(id)) {
                return Ok(Arc::clone(record));
            }
        }
        let mut table = self
            .moves
            .write()
            .map_err(|e| ContentError::Poisoned(e.to_string()))?;
        let name = synthesize_name(&key);
        Ok(table.insert(key, name, None, None))
    }

    pub fn move_by_id(&self, id: MoveId) -> ContentResult<Arc<MoveRecord>> {
        let table = self
            .moves
            .read()
            .map_err(|e| ContentError::Poisoned(e.to_string()))?;
        table
            .by_id
            .get(&id)
            .cloned()
            .ok_or(ContentError::UnknownMove(id.0))
    }

    /// `base_pp` of the stack's first effect, or [`FALLBACK_MAX_PP`].
    pub fn max_pp_for_stack(&self, stack: &[String]) -> u8 {
        stack
            .first()
            .and_then(|code| self.effects.get(code))
            .and_then(|effect| effect.base_pp)
            .unwrap_or(FALLBACK_MAX_PP)
    }

    /// A move's priority is its base effect's priority.
    pub fn move_priority(&self, record: &MoveRecord) -> i8 {
        record
            .stack_effects
            .first()
            .and_then(|code| self.effects.get(code))
            .map(|effect| effect.priority)
            .unwrap_or(0)
    }
}

fn normalize(effects: &HashMap<String, Effect>, stack: &[String], bonuses: &[String]) -> StackKey {
    let base_pos = stack
        .iter()
        .position(|code| effects.get(code).is_some_and(|e| e.base_flag_eligible))
        .unwrap_or(0);

    let mut normalized = Vec::with_capacity(stack.len());
    if let Some(base) = stack.get(base_pos) {
        normalized.push(base.clone());
    }
    let mut rest: Vec<String> = stack
        .iter()
        .enumerate()
        .filter(|(i, code)| *i != base_pos && Some(*code) != normalized.first())
        .map(|(_, code)| code.clone())
        .collect();
    rest.sort();
    rest.dedup();
    normalized.extend(rest);

    let mut bonus_codes = bonuses.to_vec();
    bonus_codes.sort();
    bonus_codes.dedup();

    StackKey {
        effects: normalized,
        bonuses: bonus_codes,
    }
}

fn synthesize_name(key: &StackKey) -> String {
    let effects = key.effects.join("+");
    if key.bonuses.is_empty() {
        effects
    } else {
        format!("{} ({})", effects, key.bonuses.join("+"))
    }
}

pub(crate) fn read_ron_table<T: DeserializeOwned>(path: &Path) -> ContentResult<Vec<T>> {
    if !path.exists() {
        tracing::warn!("Content file {} not found, using an empty table", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|e| ContentError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    ron::from_str(&content).map_err(|e| ContentError::Malformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
