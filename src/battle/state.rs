use crate::battle::stats::{self, BattleMods};
use crate::monster::{Monster, MonsterId, MoveSlot, TraitKind};
use crate::store::PlayerId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{BaseStats, DerivedStats, Growth, SpeciesData, SpeciesId, Stat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which side of a wild battle a combatant fights on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    You,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::You => Side::Enemy,
            Side::Enemy => Side::You,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    // Battle lifecycle
    WildAppeared { enemy: String, level: u32 },
    SentOut { name: String },
    Withdrawn { from: String, to: String },
    AutoSubstituted { name: String },
    ChooseReplacement,
    Escaped,
    EscapeFailed,
    CaptureFailed { target: String },
    Captured { target: String },
    TeamWiped,

    // Move resolution
    MoveUsed { user: String, move_name: String },
    MoveMissed { attacker: String, defender: String, move_name: String },
    DamageDealt { attacker: String, move_name: String, damage: u32, defender: String },
    StatusApplied { target: String, status: String, self_inflicted: bool },
    StatusIgnored { target: String, existing: String, attempted: String },
    StatChanged { target: String, stat: Stat, percent: i32 },
    NoNoticeableEffect { target: String, code: String },
    EffectApplied { user: String, code: String },
    Fainted { name: String },
    NoPpLeft { name: String, move_name: String },

    // Progression
    ExperienceGained { name: String, xp: u32 },
    LevelUp { name: String, level: u32 },
    TraitLearned { name: String, kind: TraitKind, code: String },
}

impl fmt::Display for BattleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleEvent::WildAppeared { enemy, level } => {
                write!(f, "A wild {} (Lv{}) appeared!", enemy, level)
            }
            BattleEvent::SentOut { name } => write!(f, "Go, {}!", name),
            BattleEvent::Withdrawn { from, to } => {
                write!(f, "{} was withdrawn. Go, {}!", from, to)
            }
            BattleEvent::AutoSubstituted { name } => {
                write!(f, "{} steps in as the last one standing!", name)
            }
            BattleEvent::ChooseReplacement => write!(f, "Choose your next monster."),
            BattleEvent::Escaped => write!(f, "Got away safely!"),
            BattleEvent::EscapeFailed => write!(f, "Couldn't get away!"),
            BattleEvent::CaptureFailed { target } => {
                write!(f, "Capture failed! {} broke free.", target)
            }
            BattleEvent::Captured { target } => write!(f, "Gotcha! {} was captured!", target),
            BattleEvent::TeamWiped => write!(f, "All of your monsters have fainted!"),
            BattleEvent::MoveUsed { user, move_name } => write!(f, "{} used {}!", user, move_name),
            BattleEvent::MoveMissed { attacker, defender, move_name } => {
                write!(f, "{}'s {} missed {}.", attacker, move_name, defender)
            }
            BattleEvent::DamageDealt { attacker, move_name, damage, defender } => write!(
                f,
                "{}'s {} dealt {} damage to {}.",
                attacker, move_name, damage, defender
            ),
            BattleEvent::StatusApplied { target, status, self_inflicted } => {
                if *self_inflicted {
                    write!(f, "{} became {}.", target, status)
                } else {
                    write!(f, "{} was inflicted with {}.", target, status)
                }
            }
            BattleEvent::StatusIgnored { target, existing, attempted } => write!(
                f,
                "{} is already {}; {} was ignored.",
                target, existing, attempted
            ),
            BattleEvent::StatChanged { target, stat, percent } => {
                let verb = if *percent >= 0 { "raised" } else { "lowered" };
                write!(f, "{}'s {} was {} by {}%.", target, stat, verb, percent.abs())
            }
            BattleEvent::NoNoticeableEffect { target, code } => {
                write!(f, "{} had no noticeable effect on {}.", code, target)
            }
            BattleEvent::EffectApplied { user, code } => write!(f, "{} applied {}.", user, code),
            BattleEvent::Fainted { name } => write!(f, "{} fainted!", name),
            BattleEvent::NoPpLeft { name, move_name } => {
                write!(f, "{} has no PP left for {}.", name, move_name)
            }
            BattleEvent::ExperienceGained { name, xp } => write!(f, "{} gained {} XP.", name, xp),
            BattleEvent::LevelUp { name, level } => write!(f, "{} grew to Lv{}!", name, level),
            BattleEvent::TraitLearned { kind, code, .. } => write!(f, "Learned {}: {}", kind, code),
        }
    }
}

/// Ordered battle log.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        tracing::debug!("{}", event);
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = BattleEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// The log as human-readable lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "  {}", event)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum RngSource {
    Scripted { outcomes: Vec<u8>, index: usize },
    Live(StdRng),
}

/// The single source of randomness for battles and progression.
///
/// Every draw is an outcome in 1..=100 (or a derived range/fraction) and names
/// its reason, so scripted tests can line outcomes up with the rolls they feed.
#[derive(Debug, Clone)]
pub struct TurnRng {
    source: RngSource,
}

impl TurnRng {
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            source: RngSource::Scripted { outcomes, index: 0 },
        }
    }

    pub fn new_random() -> Self {
        Self {
            source: RngSource::Live(StdRng::from_os_rng()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: RngSource::Live(StdRng::seed_from_u64(seed)),
        }
    }

    /// A uniform outcome in 1..=100.
    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        let outcome = match &mut self.source {
            RngSource::Scripted { outcomes, index } => {
                let Some(&outcome) = outcomes.get(*index) else {
                    panic!(
                        "TurnRng exhausted! Tried to get a value for: '{}'. Need more random values.",
                        reason
                    );
                };
                *index += 1;
                outcome
            }
            RngSource::Live(rng) => rng.random_range(1..=100),
        };
        tracing::trace!(reason, outcome, "rng draw");
        outcome
    }

    /// Percent roll: succeeds when the outcome is at most `round(probability * 100)`.
    pub fn chance(&mut self, probability: f64, reason: &str) -> bool {
        let threshold = (probability * 100.0).round().clamp(0.0, 100.0) as u8;
        self.next_outcome(reason) <= threshold
    }

    /// Uniform integer in `low..=high`.
    pub fn range(&mut self, low: u32, high: u32, reason: &str) -> u32 {
        if high <= low {
            return low;
        }
        if let RngSource::Live(rng) = &mut self.source {
            let value = rng.random_range(low..=high);
            tracing::trace!(reason, value, "rng draw");
            return value;
        }
        let span = high - low + 1;
        low + (u32::from(self.next_outcome(reason)) - 1) % span
    }

    /// Uniform fraction in `[0, 1)`.
    pub fn fraction(&mut self, reason: &str) -> f64 {
        if let RngSource::Live(rng) = &mut self.source {
            let value: f64 = rng.random();
            tracing::trace!(reason, value, "rng draw");
            return value;
        }
        f64::from(self.next_outcome(reason).saturating_sub(1)) / 100.0
    }
}

/// A battle-time snapshot of one monster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Combatant {
    pub side: Side,
    /// Party row backing this snapshot; wild enemies have none.
    pub monster_id: Option<MonsterId>,
    pub species_id: SpeciesId,
    pub species_name: String,
    pub nickname: Option<String>,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub growth: Growth,
    pub base_stats: BaseStats,
    pub moves: Vec<MoveSlot>,
    /// At most one negative status at a time.
    pub status: Option<String>,
}

impl Combatant {
    pub fn from_monster(monster: &Monster, species: &SpeciesData) -> Self {
        Self {
            side: Side::You,
            monster_id: Some(monster.id),
            species_id: monster.species_id,
            species_name: species.name.clone(),
            nickname: monster.nickname.clone(),
            level: monster.level,
            hp: monster.hp,
            max_hp: monster.max_hp,
            growth: monster.growth,
            base_stats: species.base_stats,
            moves: monster.moves.clone(),
            status: None,
        }
    }

    /// "Your Sproutle" / "Wild Finnow", using the nickname when set.
    pub fn display_name(&self) -> String {
        let prefix = match self.side {
            Side::You => "Your",
            Side::Enemy => "Wild",
        };
        let name = self.nickname.as_deref().unwrap_or(&self.species_name);
        format!("{} {}", prefix, name)
    }

    pub fn is_fainted(&self) -> bool {
        self.hp == 0
    }

    pub fn derived_stats(&self) -> DerivedStats {
        stats::derive(&self.base_stats, &self.growth, self.level)
    }

    /// Subtract `amount` from hp, flooring at 0. Returns the new hp.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.hp = self.hp.saturating_sub(amount);
        self.hp
    }

    pub fn has_status(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s != "none")
    }
}

/// One in-progress wild battle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleSession {
    pub player: PlayerId,
    pub you: Combatant,
    /// Party slot of `you`.
    pub you_index: usize,
    pub enemy: Combatant,
    pub mods: BattleMods,
    /// True only after the enemy is knocked out.
    pub allow_capture: bool,
    /// True while a fainted active monster awaits a chosen replacement.
    pub require_switch: bool,
    pub log: EventBus,
    pub turn_number: u32,
    /// Status of benched party slots, kept until the battle ends.
    #[serde(default)]
    pub benched_status: BTreeMap<usize, String>,
}

impl BattleSession {
    pub fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::You => &self.you,
            Side::Enemy => &self.enemy,
        }
    }
}
