pub mod calculators;
pub mod catch;
pub mod encounter;
pub mod engine;
pub mod move_effects;
pub mod service;
pub mod state;
pub mod stats;

#[cfg(test)]
pub(crate) mod tests;
