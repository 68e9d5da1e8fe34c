// Monster Battle Schema - Shared type definitions
// This crate holds the static content types (stats, effects, bonuses, species)
// that the engine crate and its content files agree on.

pub use effect_data::*;
pub use species_data::*;
pub use stat_types::*;

pub mod effect_data;
pub mod species_data;
pub mod stat_types;
