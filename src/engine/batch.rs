//! Sequential multi-draw batches
//!
//! Each draw consumes the state produced by the previous one, so a batch
//! is strictly ordered and never parallelised.

use serde::{Deserialize, Serialize};

use crate::engine::draw::{DrawEngine, DrawOutcome};
use crate::engine::random::UniformSource;
use crate::pity::PityState;
use crate::pool::PoolDefinition;

/// Upper bound on up-front outcome allocation; longer batches grow as
/// they go
const MAX_PREALLOCATED_DRAWS: usize = 1024;

/// Outcomes of a batch in draw order, plus the state after the last draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub outcomes: Vec<DrawOutcome>,
    pub final_state: PityState,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn stats(&self, pool: &PoolDefinition) -> BatchStats {
        BatchStats::collect(pool, &self.outcomes)
    }
}

/// Hit counts for one tier within a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub name: String,
    pub rarity: u8,
    pub hits: usize,
    pub featured: usize,
    pub standard: usize,
}

/// Summary of a batch for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub draws: usize,
    pub tiers: Vec<TierStats>,
    /// 1-based draw positions at which the rarest tier was hit
    pub top_tier_positions: Vec<usize>,
}

impl BatchStats {
    pub fn collect(pool: &PoolDefinition, outcomes: &[DrawOutcome]) -> Self {
        let mut tiers: Vec<TierStats> = pool
            .tiers()
            .iter()
            .map(|t| TierStats {
                name: t.name.clone(),
                rarity: t.rarity,
                ..TierStats::default()
            })
            .collect();
        let mut top_tier_positions = Vec::new();

        for (position, outcome) in outcomes.iter().enumerate() {
            if let Some(stats) = tiers.get_mut(outcome.tier) {
                stats.hits += 1;
                if outcome.resolved_from_featured {
                    stats.featured += 1;
                } else {
                    stats.standard += 1;
                }
            }
            if outcome.tier == 0 && pool.pity_tier_count() > 0 {
                top_tier_positions.push(position + 1);
            }
        }

        Self {
            draws: outcomes.len(),
            tiers,
            top_tier_positions,
        }
    }

    pub fn hits(&self, tier: usize) -> usize {
        self.tiers.get(tier).map(|t| t.hits).unwrap_or(0)
    }

    /// Rarest-first one-liner, e.g. "10 draws: 5-star x1, 4-star x2, 3-star x7"
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .tiers
            .iter()
            .map(|t| format!("{} x{}", t.name, t.hits))
            .collect();
        format!("{} draws: {}", self.draws, parts.join(", "))
    }
}

/// Runs batches of draws against one pool
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner<'a> {
    engine: DrawEngine<'a>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(pool: &'a PoolDefinition) -> Self {
        Self {
            engine: DrawEngine::new(pool),
        }
    }

    pub fn engine(&self) -> DrawEngine<'a> {
        self.engine
    }

    /// Step through `n` draws from `initial`, one outcome per `next()`.
    /// The state after the latest draw is available between steps, so a
    /// caller can persist each draw before taking the next.
    pub fn steps<'r, S: UniformSource + ?Sized>(
        &self,
        initial: &PityState,
        n: usize,
        rng: &'r mut S,
    ) -> DrawSteps<'a, 'r, S> {
        DrawSteps {
            engine: self.engine,
            state: initial.aligned_to(self.engine.pool()),
            remaining: n,
            rng,
        }
    }

    /// Run `n` draws starting from `initial`
    pub fn run_batch<S: UniformSource + ?Sized>(&self, initial: &PityState, n: usize, rng: &mut S) -> BatchResult {
        let mut outcomes = Vec::with_capacity(n.min(MAX_PREALLOCATED_DRAWS));
        let mut steps = self.steps(initial, n, rng);
        for outcome in steps.by_ref() {
            outcomes.push(outcome);
        }
        let state = steps.into_state();

        tracing::debug!(
            "Batch of {} on '{}' finished, top-tier pity now {}",
            n,
            self.engine.pool().name(),
            state.draws_since_hit(0)
        );

        BatchResult {
            outcomes,
            final_state: state,
        }
    }

    /// Run `rounds` sub-batches of `per_round` draws each, threading state
    /// through all of them. `on_round` sees each sub-batch as it completes,
    /// for progress reporting only.
    pub fn run_chunked<S, F>(
        &self,
        initial: &PityState,
        rounds: usize,
        per_round: usize,
        rng: &mut S,
        mut on_round: F,
    ) -> BatchResult
    where
        S: UniformSource + ?Sized,
        F: FnMut(usize, &BatchResult),
    {
        let mut outcomes = Vec::with_capacity(rounds.saturating_mul(per_round).min(MAX_PREALLOCATED_DRAWS));
        let mut state = initial.aligned_to(self.engine.pool());

        for round in 0..rounds {
            let sub = self.run_batch(&state, per_round, rng);
            on_round(round, &sub);
            state = sub.final_state;
            outcomes.extend(sub.outcomes);
        }

        BatchResult {
            outcomes,
            final_state: state,
        }
    }
}

/// Draw-by-draw view of a batch, see [`BatchRunner::steps`]
pub struct DrawSteps<'a, 'r, S: ?Sized> {
    engine: DrawEngine<'a>,
    state: PityState,
    remaining: usize,
    rng: &'r mut S,
}

impl<S: ?Sized> DrawSteps<'_, '_, S> {
    /// State after the most recent draw (the initial state before any)
    pub fn state(&self) -> &PityState {
        &self.state
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn into_state(self) -> PityState {
        self.state
    }
}

impl<S: UniformSource + ?Sized> Iterator for DrawSteps<'_, '_, S> {
    type Item = DrawOutcome;

    fn next(&mut self) -> Option<DrawOutcome> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (outcome, next) = self.engine.draw(&self.state, &mut *self.rng);
        self.state = next;
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
