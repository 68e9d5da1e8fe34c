use serde::{Deserialize, Serialize};

/// Bonus code with defined semantics: +0.10 accuracy on every non-self effect.
pub const ACCURACY_UP: &str = "accuracy_up";

/// Who an effect lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    /// The monster using the move.
    User,
    /// The opposing monster.
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectType {
    Damage,
    Status,
    StatChange,
    /// A kind the engine has no rule for yet; it resolves as a no-op hit.
    Custom(String),
}

/// A primitive move behavior. Moves are ordered stacks of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub code: String,
    pub target: EffectTarget,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub effect_type: EffectType,
    /// Damage channel (PHY/MAG), status name, or stat key depending on `effect_type`.
    pub stat: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub base_flag_eligible: bool,
    #[serde(default)]
    pub base_pp: Option<u8>,
    #[serde(default)]
    pub priority: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusValueType {
    Flat,
    Percent,
    Tag,
}

/// A move modifier attached next to the effect stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub code: String,
    pub value_type: BonusValueType,
    #[serde(default)]
    pub value: f64,
}

/// A catalog row giving a specific stack an admin-assigned name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMove {
    pub name: String,
    pub stack_effects: Vec<String>,
    #[serde(default)]
    pub stack_bonuses: Vec<String>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}
