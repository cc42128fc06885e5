//! Load pool definitions from TOML, JSON or legacy YAML banner documents

use ahash::AHashMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::core::error::{GachaError, Result};
use crate::core::types::{BannerType, ItemId};
use crate::pool::definition::{PoolDefinition, Tier};

/// Native pool document
///
/// ```toml
/// name = "Featured Resonator"
///
/// [[tiers]]
/// name = "5-star"
/// rarity = 5
/// base_rate = 0.008
/// soft_pity_start = 65
/// soft_pity_increment = 0.06
/// hard_pity_limit = 80
/// standard_cross_rate = 0.5
/// featured = ["jinhsi"]
/// standard = ["verina", "calcharo"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PoolDocument {
    pub name: String,
    pub tiers: Vec<TierDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierDocument {
    pub name: String,
    pub rarity: u8,
    #[serde(default)]
    pub base_rate: f64,
    #[serde(default)]
    pub soft_pity_start: Option<u32>,
    #[serde(default)]
    pub soft_pity_increment: f64,
    #[serde(default)]
    pub hard_pity_limit: Option<u32>,
    #[serde(default)]
    pub standard_cross_rate: f64,
    #[serde(default)]
    pub featured: Vec<String>,
    #[serde(default)]
    pub standard: Vec<String>,
}

impl From<TierDocument> for Tier {
    fn from(doc: TierDocument) -> Self {
        Tier {
            name: doc.name,
            rarity: doc.rarity,
            base_rate: doc.base_rate,
            soft_pity_start: doc.soft_pity_start,
            soft_pity_increment: doc.soft_pity_increment,
            hard_pity_limit: doc.hard_pity_limit,
            featured_roster: doc.featured.into_iter().map(ItemId).collect(),
            standard_roster: doc.standard.into_iter().map(ItemId).collect(),
            standard_cross_rate: doc.standard_cross_rate,
        }
    }
}

impl PoolDocument {
    pub fn into_definition(self) -> Result<PoolDefinition> {
        let tiers = self.tiers.into_iter().map(Tier::from).collect();
        PoolDefinition::new(self.name, tiers)
    }
}

/// Legacy per-banner document with fixed five/four/three star sections
///
/// `basic` is the base rate, `increase` the soft-pity increment, `other`
/// the standard cross rate, `up_pool`/`other_pool` the featured/standard
/// rosters.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyBannerDocument {
    #[serde(default)]
    pub pool_name: String,
    pub five_star: LegacyTierSection,
    pub four_star: LegacyTierSection,
    pub three_star: LegacyTierSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyTierSection {
    #[serde(default)]
    pub basic: f64,
    #[serde(default)]
    pub increase: f64,
    #[serde(default)]
    pub other: f64,
    #[serde(default)]
    pub up_pool: Vec<LegacyRosterEntry>,
    #[serde(default)]
    pub other_pool: Vec<LegacyRosterEntry>,
    #[serde(default)]
    pub soft_pity_start: Option<u32>,
    #[serde(default)]
    pub hard_pity_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRosterEntry {
    pub name: String,
    #[serde(default)]
    pub star: Option<u8>,
}

/// Thresholds the legacy sections imply when not spelled out
const LEGACY_FIVE_STAR_SOFT_START: u32 = 70;
const LEGACY_FIVE_STAR_HARD_LIMIT: u32 = 80;
const LEGACY_FOUR_STAR_HARD_LIMIT: u32 = 10;

fn roster(entries: Vec<LegacyRosterEntry>) -> Vec<ItemId> {
    entries.into_iter().map(|e| ItemId(e.name)).collect()
}

impl LegacyBannerDocument {
    pub fn into_definition(self) -> Result<PoolDefinition> {
        let five = self.five_star;
        let four = self.four_star;
        let three = self.three_star;

        let tiers = vec![
            Tier {
                name: "5-star".into(),
                rarity: 5,
                base_rate: five.basic,
                soft_pity_start: Some(five.soft_pity_start.unwrap_or(LEGACY_FIVE_STAR_SOFT_START)),
                soft_pity_increment: five.increase,
                hard_pity_limit: Some(five.hard_pity_limit.unwrap_or(LEGACY_FIVE_STAR_HARD_LIMIT)),
                featured_roster: roster(five.up_pool),
                standard_roster: roster(five.other_pool),
                standard_cross_rate: five.other,
            },
            Tier {
                name: "4-star".into(),
                rarity: 4,
                base_rate: four.basic,
                soft_pity_start: four.soft_pity_start,
                soft_pity_increment: four.increase,
                hard_pity_limit: Some(four.hard_pity_limit.unwrap_or(LEGACY_FOUR_STAR_HARD_LIMIT)),
                featured_roster: roster(four.up_pool),
                standard_roster: roster(four.other_pool),
                standard_cross_rate: four.other,
            },
            Tier {
                featured_roster: roster(three.up_pool),
                ..Tier::filler("3-star", 3, roster(three.other_pool))
            },
        ];

        let name = if self.pool_name.is_empty() {
            "Simulated Banner".to_string()
        } else {
            self.pool_name
        };
        PoolDefinition::new(name, tiers)
    }
}

pub fn parse_pool_toml(content: &str) -> Result<PoolDefinition> {
    let doc: PoolDocument = toml::from_str(content)?;
    doc.into_definition()
}

pub fn parse_pool_json(content: &str) -> Result<PoolDefinition> {
    let doc: PoolDocument = serde_json::from_str(content)?;
    doc.into_definition()
}

pub fn parse_legacy_yaml(content: &str) -> Result<PoolDefinition> {
    let doc: LegacyBannerDocument = serde_yml::from_str(content)?;
    doc.into_definition()
}

/// Load a pool document, picking the format from the file extension
pub fn load_pool(path: &Path) -> Result<PoolDefinition> {
    let content = fs::read_to_string(path)
        .map_err(|e| GachaError::invalid_pool(format!("{}: {}", path.display(), e)))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let pool = match ext.as_str() {
        "toml" => parse_pool_toml(&content),
        "json" => parse_pool_json(&content),
        "yaml" | "yml" => parse_legacy_yaml(&content),
        other => Err(GachaError::invalid_pool(format!("unsupported pool format '{}'", other))),
    }
    .map_err(|e| {
        let msg = match e {
            GachaError::InvalidPoolDefinition(msg) => msg,
            other => other.to_string(),
        };
        GachaError::invalid_pool(format!("{}: {}", path.display(), msg))
    })?;

    tracing::info!(
        "Loaded pool '{}' ({} tiers) from {}",
        pool.name(),
        pool.tiers().len(),
        path.display()
    );
    Ok(pool)
}

/// Read-only pools keyed by banner type, shared across requests
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: AHashMap<BannerType, Arc<PoolDefinition>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, banner: BannerType, pool: PoolDefinition) {
        self.pools.insert(banner, Arc::new(pool));
    }

    pub fn get(&self, banner: BannerType) -> Option<Arc<PoolDefinition>> {
        self.pools.get(&banner).cloned()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Load `<banner>.{toml,json,yaml,yml}` for every banner type found in
    /// `dir`. The first matching extension wins; any invalid document
    /// fails the whole load.
    pub fn load_directory(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        for banner in BannerType::ALL {
            for ext in ["toml", "json", "yaml", "yml"] {
                let path = dir.join(format!("{}.{}", banner.as_str(), ext));
                if path.exists() {
                    registry.insert(banner, load_pool(&path)?);
                    break;
                }
            }
        }

        if registry.is_empty() {
            tracing::warn!("No pool documents found in {}", dir.display());
        }
        Ok(registry)
    }
}
