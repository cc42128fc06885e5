//! Pity ramp analysis
//!
//! Exact first-hit distributions for a single tier, plus a Monte Carlo
//! cross-check over the full engine. The exact figures treat the tier in
//! isolation, so for tiers below the rarest they count evaluations of
//! that tier (draws not pre-empted by a rarer hit), not raw draws.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::types::TierIndex;
use crate::engine::draw::{effective_probability, DrawEngine};
use crate::engine::random::seeded;
use crate::pity::state::{Guarantee, PityState};
use crate::pool::{PoolDefinition, Tier};

/// Longest ramp the exact analysis walks before truncating
const MAX_HORIZON: usize = 10_000;
/// Remaining probability mass below which the walk stops
const SURVIVAL_EPSILON: f64 = 1e-12;
/// Safety cap on a single Monte Carlo trial
const MAX_TRIAL_DRAWS: u64 = 1_000_000;

/// `dist[k]` is the probability that the first hit lands on evaluation
/// `k + 1`, starting from a fresh counter.
pub fn hit_distribution(tier: &Tier) -> Vec<f64> {
    let mut dist = Vec::new();
    let mut survival = 1.0;

    for draws_since_hit in 0..MAX_HORIZON as u32 {
        let p = effective_probability(tier, draws_since_hit);
        dist.push(survival * p);
        survival *= 1.0 - p;
        if p >= 1.0 || survival < SURVIVAL_EPSILON {
            break;
        }
    }
    dist
}

/// Expected evaluations until the tier is hit. Infinite when the tier can
/// never be hit.
pub fn expected_draws_to_hit(tier: &Tier) -> f64 {
    let dist = hit_distribution(tier);
    let mass: f64 = dist.iter().sum();
    if mass <= 0.0 {
        return f64::INFINITY;
    }
    let weighted: f64 = dist
        .iter()
        .enumerate()
        .map(|(k, p)| (k + 1) as f64 * p)
        .sum();
    weighted / mass
}

/// Expected evaluations until a featured hit, given the tier's current
/// guarantee. A lost 50/50 costs exactly one more hit.
pub fn expected_draws_to_featured(tier: &Tier, guarantee: Guarantee) -> f64 {
    let per_hit = expected_draws_to_hit(tier);
    match guarantee {
        Guarantee::Featured => per_hit,
        Guarantee::Open => per_hit * (1.0 + tier.standard_cross_rate),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub tier: TierIndex,
    pub trials: usize,
    pub mean_draws_to_hit: f64,
    pub mean_draws_to_featured: f64,
    pub worst_draws_to_featured: u64,
    /// Share of trials whose first hit was already featured
    pub first_hit_featured_rate: f64,
}

struct Trial {
    first_hit: u64,
    featured: u64,
    first_was_featured: bool,
}

fn run_trial(pool: &PoolDefinition, tier: TierIndex, seed: u64) -> Trial {
    let engine = DrawEngine::new(pool);
    let mut rng = seeded(seed);
    let mut state = PityState::for_pool(pool);
    let mut first_hit = None;
    let mut first_was_featured = false;
    let mut draws = 0u64;

    while draws < MAX_TRIAL_DRAWS {
        let (outcome, next) = engine.draw(&state, &mut rng);
        state = next;
        draws += 1;

        if outcome.tier != tier {
            continue;
        }
        if first_hit.is_none() {
            first_hit = Some(draws);
            first_was_featured = outcome.resolved_from_featured;
        }
        if outcome.resolved_from_featured {
            break;
        }
    }

    Trial {
        first_hit: first_hit.unwrap_or(draws),
        featured: draws,
        first_was_featured,
    }
}

/// Run `trials` independent simulations from a fresh state, each until
/// the first featured hit of `tier`. Trial `i` uses seed `seed + i`, so
/// the summary is reproducible regardless of thread scheduling.
///
/// `None` for the filler tier, an out-of-range index, or a tier that can
/// never be hit.
pub fn monte_carlo(
    pool: &PoolDefinition,
    tier: TierIndex,
    trials: usize,
    seed: u64,
) -> Option<MonteCarloSummary> {
    if tier >= pool.filler_index() || expected_draws_to_hit(&pool.tiers()[tier]).is_infinite() {
        tracing::debug!("Skipping simulation of unreachable tier {} in '{}'", tier, pool.name());
        return None;
    }

    let results: Vec<Trial> = (0..trials)
        .into_par_iter()
        .map(|i| run_trial(pool, tier, seed.wrapping_add(i as u64)))
        .collect();

    let n = results.len().max(1) as f64;
    Some(MonteCarloSummary {
        tier,
        trials,
        mean_draws_to_hit: results.iter().map(|t| t.first_hit as f64).sum::<f64>() / n,
        mean_draws_to_featured: results.iter().map(|t| t.featured as f64).sum::<f64>() / n,
        worst_draws_to_featured: results.iter().map(|t| t.featured).max().unwrap_or(0),
        first_hit_featured_rate: results.iter().filter(|t| t.first_was_featured).count() as f64 / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::definition::tests::sample_pool;

    #[test]
    fn test_distribution_sums_to_one_with_hard_pity() {
        let pool = sample_pool();
        let dist = hit_distribution(&pool.tiers()[0]);
        assert!(dist.len() <= 80);
        let total: f64 = dist.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_four_star_expectation_bounded_by_hard_pity() {
        let pool = sample_pool();
        let expected = expected_draws_to_hit(&pool.tiers()[1]);
        assert!(expected > 1.0 && expected < 10.0);
    }

    #[test]
    fn test_guarantee_shortens_featured_expectation() {
        let pool = sample_pool();
        let tier = &pool.tiers()[0];
        let open = expected_draws_to_featured(tier, Guarantee::Open);
        let armed = expected_draws_to_featured(tier, Guarantee::Featured);
        assert!((open - armed * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_tier_has_infinite_expectation() {
        let mut tier = sample_pool().tiers()[0].clone();
        tier.base_rate = 0.0;
        tier.soft_pity_start = None;
        tier.hard_pity_limit = None;
        assert!(expected_draws_to_hit(&tier).is_infinite());
    }

    #[test]
    fn test_monte_carlo_reproducible_and_bounded() {
        let pool = sample_pool();
        let a = monte_carlo(&pool, 0, 200, 42).unwrap();
        let b = monte_carlo(&pool, 0, 200, 42).unwrap();
        assert_eq!(a, b);
        assert!(a.mean_draws_to_hit <= 80.0);
        assert!(a.worst_draws_to_featured <= 160);
    }

    #[test]
    fn test_monte_carlo_skips_tiers_it_cannot_finish() {
        let pool = sample_pool();
        assert!(monte_carlo(&pool, pool.filler_index(), 10, 1).is_none());
        assert!(monte_carlo(&pool, 99, 10, 1).is_none());

        let mut tiers = pool.tiers().to_vec();
        tiers[0].base_rate = 0.0;
        tiers[0].soft_pity_start = None;
        tiers[0].hard_pity_limit = None;
        let unreachable = PoolDefinition::new("Unreachable", tiers).unwrap();
        assert!(monte_carlo(&unreachable, 0, 10, 1).is_none());
        assert!(monte_carlo(&unreachable, 1, 10, 1).is_some());
    }
}
