use crate::battle::state::TurnRng;
use crate::content::read_ron_table;
use crate::errors::{ContentError, ContentResult};
use schema::{Biome, SpeciesData, SpeciesId};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Read-only species lookup.
pub trait SpeciesStore: Send + Sync {
    fn by_id(&self, id: SpeciesId) -> ContentResult<Arc<SpeciesData>>;

    /// Pick a species weighted by spawn rate among those living in `biome`.
    /// Falls back to the whole table when nothing spawns there.
    fn weighted_random_for_biome(&self, biome: Biome, rng: &mut TurnRng) -> ContentResult<Arc<SpeciesData>>;
}

#[derive(Debug, Default)]
pub struct InMemorySpeciesStore {
    species: BTreeMap<SpeciesId, Arc<SpeciesData>>,
}

impl InMemorySpeciesStore {
    pub fn new(rows: Vec<SpeciesData>) -> Self {
        let species = rows
            .into_iter()
            .map(|data| (data.id, Arc::new(data)))
            .collect();
        Self { species }
    }

    /// Load `species.ron` from the content directory.
    pub fn load(dir: &Path) -> ContentResult<Self> {
        let rows: Vec<SpeciesData> = read_ron_table(&dir.join("species.ron"))?;
        tracing::info!("Loaded {} species", rows.len());
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

impl SpeciesStore for InMemorySpeciesStore {
    fn by_id(&self, id: SpeciesId) -> ContentResult<Arc<SpeciesData>> {
        self.species
            .get(&id)
            .cloned()
            .ok_or(ContentError::UnknownSpecies(id.0))
    }

    fn weighted_random_for_biome(&self, biome: Biome, rng: &mut TurnRng) -> ContentResult<Arc<SpeciesData>> {
        let mut pool: Vec<&Arc<SpeciesData>> = self
            .species
            .values()
            .filter(|s| s.spawns_in(biome) && s.spawn_rate > 0.0)
            .collect();
        if pool.is_empty() {
            tracing::debug!("Nothing spawns in {}, rolling from the whole table", biome);
            pool = self.species.values().collect();
        }
        let last = pool.last().copied().ok_or(ContentError::NoSpecies)?;

        let total: f64 = pool.iter().map(|s| s.spawn_rate.max(0.0)).sum();
        if total <= 0.0 {
            let index = rng.range(0, pool.len() as u32 - 1, "species pick") as usize;
            return Ok(Arc::clone(pool.get(index).copied().unwrap_or(last)));
        }

        let target = rng.fraction("species pick") * total;
        let mut acc = 0.0;
        for species in &pool {
            acc += species.spawn_rate.max(0.0);
            if target < acc {
                return Ok(Arc::clone(species));
            }
        }
        Ok(Arc::clone(last))
    }
}

/// Multi-line species summary used by the demo binary.
pub struct SpeciesSummary<'a>(pub &'a SpeciesData);

impl fmt::Display for SpeciesSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0;
        writeln!(f, "{} (#{:03})", data.name, data.id.0)?;
        writeln!(f, "--------------------")?;
        if !data.types.is_empty() {
            writeln!(f, "Type(s): {}", data.types.join(" / "))?;
        }
        let biomes: Vec<String> = data.biomes.iter().map(|b| b.to_string()).collect();
        writeln!(f, "Found in: {}", biomes.join(", "))?;
        writeln!(f, "--------------------")?;

        const LABEL_WIDTH: usize = 4;
        let base = &data.base_stats;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "HP", base.hp)?;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "PHY", base.phy)?;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "MAG", base.mag)?;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "DEF", base.def)?;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "RES", base.res)?;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "SPD", base.spd)?;
        writeln!(f, "{:<LABEL_WIDTH$}: {}", "ACC", base.acc)?;
        write!(f, "{:<LABEL_WIDTH$}: {}", "EVA", base.eva)
    }
}
