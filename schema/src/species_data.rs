use crate::stat_types::BaseStats;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Biome {
    Grassland,
    Forest,
    Mountain,
    River,
    Ocean,
    Town,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u32);

/// Static species definition loaded from content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesData {
    pub id: SpeciesId,
    pub name: String,
    pub base_stats: BaseStats,
    #[serde(default)]
    pub biomes: Vec<Biome>,
    #[serde(default)]
    pub types: Vec<String>,
    /// Relative weight when rolling a wild encounter in one of `biomes`.
    #[serde(default)]
    pub spawn_rate: f64,
}

impl SpeciesData {
    pub fn spawns_in(&self, biome: Biome) -> bool {
        self.biomes.contains(&biome)
    }
}
