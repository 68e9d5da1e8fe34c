use crate::monster::MonsterId;
use crate::store::PlayerId;
use thiserror::Error;

/// Main error type for the battle engine.
///
/// Every variant except `Store` and `Content` is an expected, user-facing
/// condition: the request is rejected and battle state is left unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BattleError {
    /// Turn, capture or switch submitted while no battle is open
    #[error("no active battle")]
    NoActiveBattle,
    /// Battle start attempted with an entirely fainted party
    #[error("every party member has fainted")]
    YouFainted,
    /// The active monster fainted and a replacement must be chosen first
    #[error("choose a replacement before doing anything else")]
    MustSwitchFirst,
    /// The enemy is down; only capture or finish are accepted
    #[error("the enemy has fainted: capture it or finish the battle")]
    CaptureOrFinishPending,
    /// The chosen move has no PP left
    #[error("move slot {0} has no PP left")]
    NoPP(usize),
    /// Move slot does not exist on the active monster
    #[error("no move in slot {0}")]
    BadMoveReference(usize),
    /// Party slot does not exist, is fainted, or is already active
    #[error("invalid party index {0}")]
    BadPartyIndex(usize),
    /// A move-slot edit broke the base effect rule
    #[error("invalid move stack: {0}")]
    InvalidStack(String),
    /// Capture attempted before the enemy was knocked out
    #[error("the enemy cannot be captured yet")]
    NotAllowedToCapture,
    /// Collaborator store failure
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Content table failure
    #[error(transparent)]
    Content(#[from] ContentError),
}

impl BattleError {
    /// True for the rejections a player can cause and recover from.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, BattleError::Store(_) | BattleError::Content(_))
    }
}

/// Errors raised by the party, world and species stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("monster {0:?} not found")]
    MonsterNotFound(MonsterId),
    #[error("monster {monster:?} is not owned by {player:?}")]
    NotOwner { player: PlayerId, monster: MonsterId },
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Errors raised while loading or querying content tables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("malformed content in {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("species table is empty")]
    NoSpecies,
    #[error("no base-eligible effects are loaded")]
    NoBaseEffects,
    #[error("unknown species {0}")]
    UnknownSpecies(u32),
    #[error("unknown move id {0}")]
    UnknownMove(u32),
    #[error("content lock poisoned: {0}")]
    Poisoned(String),
}

/// Type alias for Results using BattleError
pub type BattleResult<T> = Result<T, BattleError>;

/// Type alias for Results using StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for Results using ContentError
pub type ContentResult<T> = Result<T, ContentError>;
