//! Single-draw resolution
//!
//! Tiers are checked rarest first, each with its own uniform roll. The
//! first tier whose roll lands under its effective probability is hit and
//! evaluation stops. Every tier checked and missed on the way down counts
//! the draw; tiers below the hit are not touched. If nothing above the
//! filler hits, the filler resolves.

use serde::{Deserialize, Serialize};

use crate::core::types::{ItemId, TierIndex};
use crate::engine::random::UniformSource;
use crate::pity::{Guarantee, PityState, TierCounter};
use crate::pool::{PoolDefinition, Tier};

/// Result of one draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOutcome {
    pub tier: TierIndex,
    pub rarity: u8,
    pub item_id: ItemId,
    pub resolved_from_featured: bool,
    /// Draws it took to hit this tier, counting this one. `None` for the
    /// filler tier.
    pub pity_count: Option<u32>,
}

/// Hit probability of `tier` on the next draw, given draws since its last
/// hit. Always within [0, 1].
pub fn effective_probability(tier: &Tier, draws_since_hit: u32) -> f64 {
    if let Some(limit) = tier.hard_pity_limit {
        if draws_since_hit.saturating_add(1) >= limit {
            return 1.0;
        }
    }

    let p = match tier.soft_pity_start {
        Some(start) if draws_since_hit >= start => {
            let past = (draws_since_hit - start + 1) as f64;
            tier.base_rate + past * tier.soft_pity_increment
        }
        _ => tier.base_rate,
    };
    p.clamp(0.0, 1.0)
}

/// Stateless draw engine bound to one pool
#[derive(Debug, Clone, Copy)]
pub struct DrawEngine<'a> {
    pool: &'a PoolDefinition,
}

impl<'a> DrawEngine<'a> {
    pub fn new(pool: &'a PoolDefinition) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &'a PoolDefinition {
        self.pool
    }

    /// Resolve one draw. Returns the outcome and the state to use for the
    /// next draw; `state` itself is left untouched.
    pub fn draw<S: UniformSource + ?Sized>(&self, state: &PityState, rng: &mut S) -> (DrawOutcome, PityState) {
        let mut next = state.aligned_to(self.pool);
        next.total_draws = next.total_draws.saturating_add(1);

        let filler = self.pool.filler_index();
        for (index, tier) in self.pool.tiers()[..filler].iter().enumerate() {
            let counter = next.counters[index];
            let p = effective_probability(tier, counter.draws_since_hit);

            if rng.next_unit() < p {
                let (item_id, from_featured, guarantee) = resolve_hit(tier, counter.guarantee, rng);
                next.counters[index] = TierCounter {
                    draws_since_hit: 0,
                    guarantee,
                };

                tracing::trace!(
                    "Hit tier '{}' after {} draws (p={:.4}, featured={})",
                    tier.name,
                    counter.draws_since_hit + 1,
                    p,
                    from_featured
                );

                let outcome = DrawOutcome {
                    tier: index,
                    rarity: tier.rarity,
                    item_id,
                    resolved_from_featured: from_featured,
                    pity_count: Some(counter.draws_since_hit.saturating_add(1)),
                };
                return (outcome, next);
            }

            next.counters[index].draws_since_hit = counter.draws_since_hit.saturating_add(1);
        }

        let tier = &self.pool.tiers()[filler];
        let (roster, from_featured) = tier.filler_roster();
        let outcome = DrawOutcome {
            tier: filler,
            rarity: tier.rarity,
            item_id: roster[rng.pick(roster.len())].clone(),
            resolved_from_featured: from_featured,
            pity_count: None,
        };
        (outcome, next)
    }
}

/// Featured/standard resolution of a tier hit. Returns the item, whether
/// it came from the featured roster, and the tier's next guarantee.
fn resolve_hit<S: UniformSource + ?Sized>(
    tier: &Tier,
    guarantee: Guarantee,
    rng: &mut S,
) -> (ItemId, bool, Guarantee) {
    let to_standard = match guarantee {
        Guarantee::Featured => false,
        Guarantee::Open => rng.next_unit() < tier.standard_cross_rate,
    };

    if to_standard {
        let roster = &tier.standard_roster;
        (roster[rng.pick(roster.len())].clone(), false, Guarantee::Featured)
    } else {
        let roster = &tier.featured_roster;
        (roster[rng.pick(roster.len())].clone(), true, Guarantee::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::random::{seeded, ConstantSource, ScriptedSource};
    use crate::pool::definition::tests::sample_pool;

    #[test]
    fn test_base_rate_below_soft_pity() {
        let pool = sample_pool();
        let five = &pool.tiers()[0];
        assert_eq!(effective_probability(five, 0), 0.008);
        assert_eq!(effective_probability(five, 10), 0.008);
        assert_eq!(effective_probability(five, 64), 0.008);
    }

    #[test]
    fn test_soft_pity_ramp_is_monotonic() {
        let pool = sample_pool();
        let five = &pool.tiers()[0];
        assert!((effective_probability(five, 65) - (0.008 + 0.06)).abs() < 1e-12);
        assert!((effective_probability(five, 66) - (0.008 + 0.12)).abs() < 1e-12);

        let mut last = 0.0;
        for draws in 0..100 {
            let p = effective_probability(five, draws);
            assert!(p >= last);
            assert!(p <= 1.0);
            last = p;
        }
    }

    #[test]
    fn test_hard_pity_forces_hit() {
        let pool = sample_pool();
        assert_eq!(effective_probability(&pool.tiers()[0], 79), 1.0);
        assert_eq!(effective_probability(&pool.tiers()[1], 9), 1.0);
        assert!(effective_probability(&pool.tiers()[1], 8) < 1.0);
    }

    #[test]
    fn test_soft_pity_clamped_without_hard_limit() {
        let mut tier = sample_pool().tiers()[0].clone();
        tier.hard_pity_limit = None;
        assert_eq!(effective_probability(&tier, 500), 1.0);
    }

    #[test]
    fn test_hard_pity_draw_resolves_through_fifty_fifty() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let state = PityState::for_pool(&pool).with_counter(0, 79, Guarantee::Open);

        // Tier roll 0.999 still hits (p = 1); 50/50 roll 0.2 < 0.5 -> standard
        let mut rng = ScriptedSource::new([0.999, 0.2], [1]);
        let (outcome, next) = engine.draw(&state, &mut rng);

        assert_eq!(outcome.tier, 0);
        assert_eq!(outcome.item_id, ItemId::from("std_5_b"));
        assert!(!outcome.resolved_from_featured);
        assert_eq!(outcome.pity_count, Some(80));
        assert_eq!(next.draws_since_hit(0), 0);
        assert_eq!(next.guarantee(0), Guarantee::Featured);
    }

    #[test]
    fn test_guarantee_forces_featured_without_rolling() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let state = PityState::for_pool(&pool).with_counter(0, 79, Guarantee::Featured);

        // Only the tier roll is consumed; the 0.0 would have sent a 50/50 to standard
        let mut rng = ScriptedSource::new([0.5, 0.0], [0]);
        let (outcome, next) = engine.draw(&state, &mut rng);

        assert!(outcome.resolved_from_featured);
        assert_eq!(outcome.item_id, ItemId::from("featured_5"));
        assert_eq!(next.guarantee(0), Guarantee::Open);
        assert_eq!(rng.remaining_units(), 1);
    }

    #[test]
    fn test_higher_hit_leaves_lower_counters_alone() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let state = PityState::for_pool(&pool)
            .with_counter(0, 30, Guarantee::Open)
            .with_counter(1, 4, Guarantee::Featured);

        let mut rng = ScriptedSource::new([0.001, 0.9], [0]);
        let (outcome, next) = engine.draw(&state, &mut rng);

        assert_eq!(outcome.tier, 0);
        assert_eq!(next.draws_since_hit(0), 0);
        assert_eq!(next.counter(1), state.counter(1));
        assert_eq!(next.total_draws, 1);
    }

    #[test]
    fn test_lower_hit_counts_draw_for_higher_tier() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let state = PityState::for_pool(&pool).with_counter(0, 30, Guarantee::Open);

        // 5-star misses, 4-star hits, 50/50 stays featured
        let mut rng = ScriptedSource::new([0.9, 0.01, 0.7], [2]);
        let (outcome, next) = engine.draw(&state, &mut rng);

        assert_eq!(outcome.tier, 1);
        assert_eq!(outcome.item_id, ItemId::from("featured_4_c"));
        assert_eq!(next.draws_since_hit(0), 31);
        assert_eq!(next.draws_since_hit(1), 0);
        assert_eq!(next.guarantee(1), Guarantee::Open);
    }

    #[test]
    fn test_total_miss_falls_to_filler_and_counts_every_tier() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let state = PityState::for_pool(&pool).with_counter(1, 3, Guarantee::Open);

        let mut rng = ConstantSource::new(0.99);
        let (outcome, next) = engine.draw(&state, &mut rng);

        assert_eq!(outcome.tier, pool.filler_index());
        assert_eq!(outcome.rarity, 3);
        assert_eq!(outcome.pity_count, None);
        assert!(!outcome.resolved_from_featured);
        assert_eq!(next.draws_since_hit(0), 1);
        assert_eq!(next.draws_since_hit(1), 4);
    }

    #[test]
    fn test_draw_does_not_mutate_input_state() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let state = PityState::for_pool(&pool);
        let before = state.clone();
        let mut rng = seeded(3);
        let _ = engine.draw(&state, &mut rng);
        assert_eq!(state, before);
    }

    #[test]
    fn test_draw_aligns_empty_state() {
        let pool = sample_pool();
        let engine = DrawEngine::new(&pool);
        let mut rng = ConstantSource::new(0.99);
        let (_, next) = engine.draw(&PityState::new(), &mut rng);
        assert_eq!(next.counters.len(), 2);
    }
}
