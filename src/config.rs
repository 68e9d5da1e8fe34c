use crate::errors::{ContentError, ContentResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = include_str!("../config/engine.toml");

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory holding effects.ron, bonuses.ron, moves_named.ron and species.ron.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    /// When set, every battle draws from an RNG seeded from this value.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    /// Battles untouched for this long are treated as abandoned.
    #[serde(default = "default_idle_ttl")]
    pub session_idle_ttl_secs: u64,
    /// Wild levels are rolled within this many levels of the lead monster.
    #[serde(default = "default_level_spread")]
    pub wild_level_spread: u32,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_idle_ttl() -> u64 {
    1800
}

fn default_level_spread() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            rng_seed: None,
            session_idle_ttl_secs: default_idle_ttl(),
            wild_level_spread: default_level_spread(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> ContentResult<Self> {
        toml::from_str(source).map_err(|e| {
            tracing::error!("Failed to parse engine config: {}", e);
            ContentError::Malformed {
                path: "engine config".to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// The config compiled into the binary.
    pub fn embedded() -> ContentResult<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Load from `path`, falling back to the embedded config when the file is absent.
    pub fn load(path: &Path) -> ContentResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using embedded defaults", path.display());
            return Self::embedded();
        }
        let source = std::fs::read_to_string(path).map_err(|e| ContentError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&source)
    }
}
