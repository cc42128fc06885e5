//! Request-level orchestration
//!
//! `GachaService` is the caller the engine expects: it takes the per-key
//! lock, loads pity state, runs the batch, persists the result and only
//! then resolves display assets for the finished outcome list.

mod locks;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::assets::{resolve_outcomes, AssetResolver, CatalogResolver, NameResolver, ResolvedDraw};
use crate::core::config::{EngineConfig, PersistPolicy};
use crate::core::error::{GachaError, Result};
use crate::core::types::{BannerType, RequestId, UserId};
use crate::engine::{BatchResult, BatchRunner, BatchStats, DrawOutcome};
use crate::pity::PityState;
use crate::pool::{PoolDefinition, PoolRegistry};
use crate::store::{StateStore, StoreKey};

pub use locks::{KeyGuard, KeyLocks};

/// Progress of a chunked request, reported after each sub-batch
#[derive(Debug, Clone, Copy)]
pub struct RoundProgress<'a> {
    pub round: usize,
    pub rounds: usize,
    pub outcomes: &'a [DrawOutcome],
    pub state: &'a PityState,
}

/// Everything the presentation layer needs about a finished request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullReport {
    pub request_id: RequestId,
    pub user: UserId,
    pub banner: BannerType,
    pub pool_name: String,
    pub draws: Vec<ResolvedDraw>,
    pub stats: BatchStats,
    pub final_state: PityState,
    /// Draws since the rarest tier was last hit
    pub top_tier_pity: u32,
}

pub struct GachaService<S> {
    config: EngineConfig,
    pools: PoolRegistry,
    store: S,
    locks: KeyLocks,
    resolver: Box<dyn AssetResolver>,
    rng: Mutex<ChaCha8Rng>,
}

impl<S: StateStore> GachaService<S> {
    pub fn new(config: EngineConfig, pools: PoolRegistry, store: S) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            locks: KeyLocks::new(config.lock_timeout()),
            config,
            pools,
            store,
            resolver: Box::new(NameResolver),
            rng: Mutex::new(rng),
        }
    }

    /// Build from configuration: pools from `pool_dir`, the asset catalog
    /// from `catalog_path` if set.
    pub fn from_config(config: EngineConfig, store: S) -> Result<Self> {
        config.validate()?;
        let pools = PoolRegistry::load_directory(&config.pool_dir)?;
        let catalog = config
            .catalog_path
            .as_deref()
            .map(CatalogResolver::load)
            .transpose()?;

        let service = Self::new(config, pools, store);
        Ok(match catalog {
            Some(catalog) => service.with_resolver(catalog),
            None => service,
        })
    }

    pub fn with_resolver(mut self, resolver: impl AssetResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pool(&self, banner: BannerType) -> Result<Arc<PoolDefinition>> {
        self.pools
            .get(banner)
            .ok_or_else(|| GachaError::config(format!("no pool configured for banner '{}'", banner)))
    }

    /// One regular batch ("ten-pull")
    pub async fn pull(&self, user: &UserId, banner: BannerType) -> Result<PullReport> {
        self.pull_n(user, banner, self.config.batch_size).await
    }

    pub async fn pull_n(&self, user: &UserId, banner: BannerType, n: usize) -> Result<PullReport> {
        self.run(user, banner, 1, n, |_| {}).await
    }

    /// Large batch: `large_batch_rounds` sub-batches of `batch_size` draws
    /// under a single lock acquisition. `on_round` fires after each
    /// sub-batch for progress reporting.
    pub async fn pull_large<F>(&self, user: &UserId, banner: BannerType, on_round: F) -> Result<PullReport>
    where
        F: FnMut(RoundProgress<'_>),
    {
        let rounds = self.config.large_batch_rounds;
        let per_round = self.config.batch_size;
        self.run(user, banner, rounds, per_round, on_round).await
    }

    /// Return the user's pity on `banner` to the zero state
    pub async fn reset(&self, user: &UserId, banner: BannerType) -> Result<()> {
        let key = StoreKey::new(&self.config.namespace, banner, user);
        let _guard = self.locks.acquire(&key).await?;
        self.store.reset(user, banner).await?;
        tracing::info!("Reset pity at {}", key);
        Ok(())
    }

    /// Current persisted state, sized to the banner's pool
    pub async fn state(&self, user: &UserId, banner: BannerType) -> Result<PityState> {
        let pool = self.pool(banner)?;
        Ok(self.store.load(user, banner).await?.aligned_to(&pool))
    }

    /// Reject batches above `max_batch_draws` before anything is drawn
    fn check_batch_size(&self, rounds: usize, per_round: usize) -> Result<()> {
        let limit = self.config.max_batch_draws;
        match rounds.checked_mul(per_round) {
            Some(total) if total <= limit => Ok(()),
            _ => Err(GachaError::config(format!(
                "batch of {}x{} draws exceeds max_batch_draws ({})",
                rounds, per_round, limit
            ))),
        }
    }

    async fn request_rng(&self) -> ChaCha8Rng {
        let mut master = self.rng.lock().await;
        ChaCha8Rng::seed_from_u64(master.gen::<u64>())
    }

    async fn run<F>(
        &self,
        user: &UserId,
        banner: BannerType,
        rounds: usize,
        per_round: usize,
        on_round: F,
    ) -> Result<PullReport>
    where
        F: FnMut(RoundProgress<'_>),
    {
        let request_id = RequestId::new();
        let span = tracing::info_span!("pull", request = %request_id, user = %user, banner = %banner);

        async move {
            let pool = self.pool(banner)?;
            self.check_batch_size(rounds, per_round)?;
            let key = StoreKey::new(&self.config.namespace, banner, user);
            let _guard = self.locks.acquire(&key).await?;

            let initial = self.store.load(user, banner).await?;
            let mut rng = self.request_rng().await;
            tracing::debug!("Running {}x{} draws on '{}'", rounds, per_round, pool.name());

            let result = match self.config.persist {
                PersistPolicy::PerBatch => {
                    let result = run_in_memory(&pool, &initial, rounds, per_round, &mut rng, on_round);
                    if let Err(e) = self.store.save(user, banner, &result.final_state).await {
                        tracing::warn!("Save failed, discarding batch of {}: {}", result.len(), e);
                        return Err(e);
                    }
                    result
                }
                PersistPolicy::PerDraw => {
                    self.run_committing(&pool, user, banner, &initial, rounds, per_round, &mut rng, on_round)
                        .await?
                }
            };

            let stats = result.stats(&pool);
            tracing::info!("{}", stats.summary());

            Ok(PullReport {
                request_id,
                user: user.clone(),
                banner,
                pool_name: pool.name().to_string(),
                draws: resolve_outcomes(self.resolver.as_ref(), &result.outcomes),
                stats,
                top_tier_pity: result.final_state.draws_since_hit(0),
                final_state: result.final_state,
            })
        }
        .instrument(span)
        .await
    }

    /// Draw and save one at a time through `BatchRunner::steps`. A failed
    /// save stops the batch; every draw before it stays committed and is
    /// handed back in the error.
    #[allow(clippy::too_many_arguments)]
    async fn run_committing<F>(
        &self,
        pool: &PoolDefinition,
        user: &UserId,
        banner: BannerType,
        initial: &PityState,
        rounds: usize,
        per_round: usize,
        rng: &mut ChaCha8Rng,
        mut on_round: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(RoundProgress<'_>),
    {
        let runner = BatchRunner::new(pool);
        let requested = rounds * per_round;
        let mut outcomes = Vec::with_capacity(requested);
        let mut state = initial.aligned_to(pool);

        for round in 0..rounds {
            let round_start = outcomes.len();
            let mut steps = runner.steps(&state, per_round, &mut *rng);
            while let Some(outcome) = steps.next() {
                if let Err(e) = self.store.save(user, banner, steps.state()).await {
                    let committed = outcomes.len();
                    tracing::warn!("Save failed after {}/{} draws: {}", committed, requested, e);
                    if committed == 0 {
                        return Err(e);
                    }
                    return Err(GachaError::PartialCommit {
                        committed,
                        requested,
                        draws: resolve_outcomes(self.resolver.as_ref(), &outcomes),
                        final_state: state,
                        source: Box::new(e),
                    });
                }
                outcomes.push(outcome);
                state = steps.state().clone();
            }
            on_round(RoundProgress {
                round,
                rounds,
                outcomes: &outcomes[round_start..],
                state: &state,
            });
        }

        Ok(BatchResult {
            outcomes,
            final_state: state,
        })
    }
}

fn run_in_memory<F>(
    pool: &PoolDefinition,
    initial: &PityState,
    rounds: usize,
    per_round: usize,
    rng: &mut ChaCha8Rng,
    mut on_round: F,
) -> BatchResult
where
    F: FnMut(RoundProgress<'_>),
{
    BatchRunner::new(pool).run_chunked(initial, rounds, per_round, rng, |round, sub| {
        on_round(RoundProgress {
            round,
            rounds,
            outcomes: &sub.outcomes,
            state: &sub.final_state,
        })
    })
}
