//! Per-user, per-banner pity counters

use serde::{Deserialize, Serialize};

use crate::core::types::TierIndex;
use crate::pool::PoolDefinition;

/// Whether the next hit of a tier still goes through the 50/50 roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guarantee {
    /// Next hit rolls against `standard_cross_rate`
    Open,
    /// Previous hit went to the standard roster; next hit is featured
    Featured,
}

impl Default for Guarantee {
    fn default() -> Self {
        Guarantee::Open
    }
}

/// Counter pair for one tier above the filler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounter {
    pub draws_since_hit: u32,
    pub guarantee: Guarantee,
}

impl TierCounter {
    pub fn is_zero(&self) -> bool {
        self.draws_since_hit == 0 && self.guarantee == Guarantee::Open
    }
}

/// Mutable pity state of one (user, banner) pair
///
/// `counters[i]` belongs to tier `i` of the pool; the filler tier has no
/// counter. An empty state is the zero state for any pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityState {
    #[serde(default)]
    pub counters: Vec<TierCounter>,
    /// Lifetime draws on this banner
    #[serde(default)]
    pub total_draws: u64,
}

impl PityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero state sized for `pool`
    pub fn for_pool(pool: &PoolDefinition) -> Self {
        Self {
            counters: vec![TierCounter::default(); pool.pity_tier_count()],
            total_draws: 0,
        }
    }

    /// Copy resized to `pool`'s pity tiers. Missing counters start at zero
    /// and surplus counters (pool lost a tier) are dropped.
    pub fn aligned_to(&self, pool: &PoolDefinition) -> Self {
        let mut aligned = self.clone();
        aligned
            .counters
            .resize(pool.pity_tier_count(), TierCounter::default());
        aligned
    }

    pub fn counter(&self, tier: TierIndex) -> TierCounter {
        self.counters.get(tier).copied().unwrap_or_default()
    }

    pub fn draws_since_hit(&self, tier: TierIndex) -> u32 {
        self.counter(tier).draws_since_hit
    }

    pub fn guarantee(&self, tier: TierIndex) -> Guarantee {
        self.counter(tier).guarantee
    }

    pub fn is_zero(&self) -> bool {
        self.total_draws == 0 && self.counters.iter().all(TierCounter::is_zero)
    }

    /// Builder used by tests and tools to seed a specific counter
    pub fn with_counter(mut self, tier: TierIndex, draws_since_hit: u32, guarantee: Guarantee) -> Self {
        if self.counters.len() <= tier {
            self.counters.resize(tier + 1, TierCounter::default());
        }
        self.counters[tier] = TierCounter {
            draws_since_hit,
            guarantee,
        };
        self
    }
}

/// Flat record layout kept by the legacy bot for a two-tier banner
///
/// `*_other == true` means the 50/50 is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPityRecord {
    pub five_star_time: u32,
    pub five_star_other: bool,
    pub four_star_time: u32,
    pub four_star_other: bool,
}

fn guarantee_from_flag(other_open: bool) -> Guarantee {
    if other_open {
        Guarantee::Open
    } else {
        Guarantee::Featured
    }
}

impl From<LegacyPityRecord> for PityState {
    fn from(record: LegacyPityRecord) -> Self {
        PityState::new()
            .with_counter(0, record.five_star_time, guarantee_from_flag(record.five_star_other))
            .with_counter(1, record.four_star_time, guarantee_from_flag(record.four_star_other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::definition::tests::sample_pool;

    #[test]
    fn test_zero_state_for_pool() {
        let state = PityState::for_pool(&sample_pool());
        assert_eq!(state.counters.len(), 2);
        assert!(state.is_zero());
        assert!(PityState::new().is_zero());
    }

    #[test]
    fn test_alignment_pads_and_truncates() {
        let pool = sample_pool();
        let short = PityState::new().with_counter(0, 12, Guarantee::Featured);
        let aligned = short.aligned_to(&pool);
        assert_eq!(aligned.counters.len(), 2);
        assert_eq!(aligned.draws_since_hit(0), 12);
        assert!(aligned.counter(1).is_zero());

        let long = PityState::new().with_counter(4, 3, Guarantee::Open);
        assert_eq!(long.aligned_to(&pool).counters.len(), 2);
    }

    #[test]
    fn test_legacy_record_conversion() {
        let record: LegacyPityRecord = serde_json::from_str(
            r#"{"five_star_time":42,"five_star_other":false,"four_star_time":3,"four_star_other":true}"#,
        )
        .unwrap();
        let state = PityState::from(record);
        assert_eq!(state.draws_since_hit(0), 42);
        assert_eq!(state.guarantee(0), Guarantee::Featured);
        assert_eq!(state.draws_since_hit(1), 3);
        assert_eq!(state.guarantee(1), Guarantee::Open);
    }

    #[test]
    fn test_missing_fields_deserialize_to_zero() {
        let state: PityState = serde_json::from_str("{}").unwrap();
        assert!(state.is_zero());
    }
}
