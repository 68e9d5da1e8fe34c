//! Monster Battle Engine
//!
//! Turn-based wild battles for a monster-collection game backend. Moves are
//! composed from primitive effects and bonuses, resolved against
//! per-battle stat modifiers, and feed experience and trait learning back
//! into the player's party.

pub mod battle;
pub mod config;
pub mod content;
pub mod errors;
pub mod monster;
pub mod party;
pub mod progression;
pub mod species;
pub mod stack;
pub mod store;

// --- From the `schema` crate ---
pub use schema::{
    BaseStats, Biome, Bonus, BonusValueType, DerivedStats, Effect, EffectTarget, EffectType, Growth, NamedMove,
    SpeciesData, SpeciesId, Stat, StatBlock,
};

// --- From this crate's modules ---
pub use battle::engine::{BattleContext, BattleOutcome, TurnAction, TurnStatus};
pub use battle::service::{BattleService, BattleView, PpEntry, TurnResult};
pub use battle::state::{BattleEvent, BattleSession, Combatant, EventBus, Side, TurnRng};
pub use config::EngineConfig;
pub use content::{ContentRegistry, MoveId, MoveRecord};
pub use monster::{Monster, MonsterId, MoveSlot};
pub use species::{InMemorySpeciesStore, SpeciesStore};
pub use store::{InMemoryPartyStore, InMemoryWorldStore, PartyStore, PlayerId, WorldStore};

pub use errors::{BattleError, BattleResult, ContentError, ContentResult, StoreError, StoreResult};
