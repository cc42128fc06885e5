//! Banner pool definitions
//!
//! A `PoolDefinition` is immutable once built and always valid: the only
//! way to obtain one is through `PoolDefinition::new`, which rejects every
//! configuration the draw engine could trip over. That keeps `draw`
//! infallible.

use serde::{Deserialize, Serialize};

use crate::core::error::{GachaError, Result};
use crate::core::types::{ItemId, TierIndex};

/// One rarity tier of a banner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Display name, e.g. "5-star"
    pub name: String,
    /// Star count shown to players
    pub rarity: u8,
    /// Hit probability before any soft-pity escalation
    pub base_rate: f64,
    /// Draws since last hit at which the ramp starts
    pub soft_pity_start: Option<u32>,
    /// Added per draw once the ramp has started
    pub soft_pity_increment: f64,
    /// Draw count at which a hit is forced
    pub hard_pity_limit: Option<u32>,
    pub featured_roster: Vec<ItemId>,
    pub standard_roster: Vec<ItemId>,
    /// Chance a hit goes to the standard roster while the guarantee is not
    /// armed
    pub standard_cross_rate: f64,
}

impl Tier {
    /// A filler tier: no pity tracking, always resolves from its roster.
    pub fn filler(name: impl Into<String>, rarity: u8, roster: Vec<ItemId>) -> Self {
        Self {
            name: name.into(),
            rarity,
            base_rate: 1.0,
            soft_pity_start: None,
            soft_pity_increment: 0.0,
            hard_pity_limit: None,
            featured_roster: Vec::new(),
            standard_roster: roster,
            standard_cross_rate: 0.0,
        }
    }

    pub fn has_pity(&self) -> bool {
        self.soft_pity_start.is_some() || self.hard_pity_limit.is_some()
    }

    /// Roster a filler tier draws from: standard when present, else featured
    pub(crate) fn filler_roster(&self) -> (&[ItemId], bool) {
        if self.standard_roster.is_empty() {
            (&self.featured_roster, true)
        } else {
            (&self.standard_roster, false)
        }
    }

    fn validate_rates(&self) -> Result<()> {
        let unit = |label: &str, v: f64| -> Result<()> {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(GachaError::invalid_pool(format!(
                    "tier '{}': {} must be within [0, 1], got {}",
                    self.name, label, v
                )));
            }
            Ok(())
        };
        unit("base_rate", self.base_rate)?;
        unit("standard_cross_rate", self.standard_cross_rate)?;

        if !self.soft_pity_increment.is_finite() || self.soft_pity_increment < 0.0 {
            return Err(GachaError::invalid_pool(format!(
                "tier '{}': soft_pity_increment must be non-negative, got {}",
                self.name, self.soft_pity_increment
            )));
        }
        Ok(())
    }

    fn validate_pity(&self) -> Result<()> {
        if let Some(limit) = self.hard_pity_limit {
            if limit == 0 {
                return Err(GachaError::invalid_pool(format!(
                    "tier '{}': hard_pity_limit must be at least 1",
                    self.name
                )));
            }
            if let Some(start) = self.soft_pity_start {
                if start >= limit {
                    return Err(GachaError::invalid_pool(format!(
                        "tier '{}': soft_pity_start ({}) must be below hard_pity_limit ({})",
                        self.name, start, limit
                    )));
                }
            }
        }

        if self.featured_roster.is_empty() {
            return Err(GachaError::invalid_pool(format!(
                "tier '{}': featured roster is empty",
                self.name
            )));
        }
        if self.standard_cross_rate > 0.0 && self.standard_roster.is_empty() {
            return Err(GachaError::invalid_pool(format!(
                "tier '{}': standard roster is empty but standard_cross_rate is {}",
                self.name, self.standard_cross_rate
            )));
        }
        Ok(())
    }

    fn validate_filler(&self) -> Result<()> {
        if self.has_pity() {
            return Err(GachaError::invalid_pool(format!(
                "filler tier '{}' cannot carry pity thresholds",
                self.name
            )));
        }
        if self.featured_roster.is_empty() && self.standard_roster.is_empty() {
            return Err(GachaError::invalid_pool(format!(
                "filler tier '{}' has no items",
                self.name
            )));
        }
        Ok(())
    }
}

/// Static description of a banner. Tiers are ordered rarest first and the
/// last tier is the filler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolDefinition {
    name: String,
    tiers: Vec<Tier>,
}

impl PoolDefinition {
    pub fn new(name: impl Into<String>, tiers: Vec<Tier>) -> Result<Self> {
        let pool = Self {
            name: name.into(),
            tiers,
        };
        pool.validate()?;
        Ok(pool)
    }

    fn validate(&self) -> Result<()> {
        let Some((filler, pity_tiers)) = self.tiers.split_last() else {
            return Err(GachaError::invalid_pool(format!(
                "pool '{}' has no tiers",
                self.name
            )));
        };

        for tier in pity_tiers {
            tier.validate_rates()?;
            tier.validate_pity()?;
        }
        filler.validate_rates()?;
        filler.validate_filler()?;

        for pair in self.tiers.windows(2) {
            if pair[0].rarity < pair[1].rarity {
                return Err(GachaError::invalid_pool(format!(
                    "pool '{}': tier '{}' listed before rarer tier '{}'",
                    self.name, pair[0].name, pair[1].name
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, index: TierIndex) -> Option<&Tier> {
        self.tiers.get(index)
    }

    /// Index of the filler tier (always the last one)
    pub fn filler_index(&self) -> TierIndex {
        self.tiers.len() - 1
    }

    /// Number of tiers above the filler, i.e. tiers with pity counters
    pub fn pity_tier_count(&self) -> usize {
        self.tiers.len() - 1
    }

    pub fn tier_by_rarity(&self, rarity: u8) -> Option<(TierIndex, &Tier)> {
        self.tiers.iter().enumerate().find(|(_, t)| t.rarity == rarity)
    }
}
