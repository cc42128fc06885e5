//! Banner pool definitions and their loaders

pub mod definition;
mod loader;

pub use definition::{PoolDefinition, Tier};
pub use loader::{
    load_pool, parse_legacy_yaml, parse_pool_json, parse_pool_toml, LegacyBannerDocument,
    LegacyRosterEntry, LegacyTierSection, PoolDocument, PoolRegistry, TierDocument,
};
