use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The eight stat channels a monster carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Stat {
    #[strum(serialize = "HP")]
    Hp,
    #[strum(serialize = "PHY")]
    Phy,
    #[strum(serialize = "MAG")]
    Mag,
    #[strum(serialize = "DEF")]
    Def,
    #[strum(serialize = "RES")]
    Res,
    #[strum(serialize = "SPD")]
    Spd,
    #[strum(serialize = "ACC")]
    Acc,
    #[strum(serialize = "EVA")]
    Eva,
}

impl Stat {
    /// ACC and EVA ignore the level curve and get a narrower growth roll.
    pub fn is_primary(self) -> bool {
        !matches!(self, Stat::Acc | Stat::Eva)
    }
}

/// One value per stat. Used for species base stats, growth multipliers,
/// derived battle stats and per-battle modifier accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatBlock<T> {
    pub hp: T,
    pub phy: T,
    pub mag: T,
    pub def: T,
    pub res: T,
    pub spd: T,
    pub acc: T,
    pub eva: T,
}

impl<T: Copy> StatBlock<T> {
    pub fn splat(value: T) -> Self {
        Self {
            hp: value,
            phy: value,
            mag: value,
            def: value,
            res: value,
            spd: value,
            acc: value,
            eva: value,
        }
    }

    pub fn get(&self, stat: Stat) -> T {
        match stat {
            Stat::Hp => self.hp,
            Stat::Phy => self.phy,
            Stat::Mag => self.mag,
            Stat::Def => self.def,
            Stat::Res => self.res,
            Stat::Spd => self.spd,
            Stat::Acc => self.acc,
            Stat::Eva => self.eva,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut T {
        match stat {
            Stat::Hp => &mut self.hp,
            Stat::Phy => &mut self.phy,
            Stat::Mag => &mut self.mag,
            Stat::Def => &mut self.def,
            Stat::Res => &mut self.res,
            Stat::Spd => &mut self.spd,
            Stat::Acc => &mut self.acc,
            Stat::Eva => &mut self.eva,
        }
    }

    /// Build a new block by applying `f` to every (stat, value) pair.
    pub fn map<U>(&self, mut f: impl FnMut(Stat, T) -> U) -> StatBlock<U> {
        StatBlock {
            hp: f(Stat::Hp, self.hp),
            phy: f(Stat::Phy, self.phy),
            mag: f(Stat::Mag, self.mag),
            def: f(Stat::Def, self.def),
            res: f(Stat::Res, self.res),
            spd: f(Stat::Spd, self.spd),
            acc: f(Stat::Acc, self.acc),
            eva: f(Stat::Eva, self.eva),
        }
    }
}

/// Species base stat octet.
pub type BaseStats = StatBlock<u16>;

/// Per-monster individual multipliers, fixed at creation.
pub type Growth = StatBlock<f64>;

/// Current battle stats after the level curve (and modifiers, when applied).
pub type DerivedStats = StatBlock<u32>;

/// Neutral growth used for wild snapshots and as the serde default.
pub fn neutral_growth() -> Growth {
    StatBlock::splat(1.0)
}
