//! Pity state and analysis of pity ramps

pub mod analysis;
pub mod state;

pub use analysis::{
    expected_draws_to_featured, expected_draws_to_hit, hit_distribution, monte_carlo, MonteCarloSummary,
};
pub use state::{Guarantee, LegacyPityRecord, PityState, TierCounter};
