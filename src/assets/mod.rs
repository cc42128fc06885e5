//! Item display assets
//!
//! Draws carry opaque `ItemId`s. Turning them into something displayable
//! happens only after a batch has been finalised, through an
//! `AssetResolver`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{GachaError, Result};
use crate::core::types::ItemId;
use crate::engine::DrawOutcome;

/// What the presentation layer should show for an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AssetRef {
    /// Image URL or path
    Image(String),
    /// No asset known; show the item name
    Name(String),
}

pub trait AssetResolver: Send + Sync {
    fn resolve(&self, item: &ItemId) -> AssetRef;
}

/// Shows every item by its id
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl AssetResolver for NameResolver {
    fn resolve(&self, item: &ItemId) -> AssetRef {
        AssetRef::Name(item.to_string())
    }
}

/// One entry of a local asset catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub image: String,
    #[serde(default)]
    pub star: Option<u8>,
}

/// Local catalog keyed by item id, falling back to the item id for
/// unknown items
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    entries: AHashMap<ItemId, CatalogEntry>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: ItemId, entry: CatalogEntry) {
        self.entries.insert(item, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_map(map: BTreeMap<String, CatalogEntry>) -> Self {
        Self {
            entries: map.into_iter().map(|(k, v)| (ItemId(k), v)).collect(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(Self::from_map(toml::from_str(content)?))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(Self::from_map(serde_yml::from_str(content)?))
    }

    /// Load a `.toml` or `.yaml`/`.yml` catalog
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GachaError::config(format!("{}: {}", path.display(), e)))?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => {
                return Err(GachaError::config(format!(
                    "{}: asset catalog must be .toml or .yaml",
                    path.display()
                )))
            }
        };
        let catalog = parsed.map_err(|e| GachaError::config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }
}

impl AssetResolver for CatalogResolver {
    fn resolve(&self, item: &ItemId) -> AssetRef {
        match self.entries.get(item) {
            Some(entry) if !entry.image.is_empty() => AssetRef::Image(entry.image.clone()),
            _ => AssetRef::Name(item.to_string()),
        }
    }
}

/// A draw paired with its display asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDraw {
    #[serde(flatten)]
    pub outcome: DrawOutcome,
    pub asset: AssetRef,
}

pub fn resolve_outcomes(resolver: &dyn AssetResolver, outcomes: &[DrawOutcome]) -> Vec<ResolvedDraw> {
    outcomes
        .iter()
        .map(|outcome| ResolvedDraw {
            asset: resolver.resolve(&outcome.item_id),
            outcome: outcome.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_hit_and_fallback() {
        let catalog = CatalogResolver::from_yaml_str(
            r#"
Jinhsi:
  name: Jinhsi
  image: https://example.invalid/jinhsi.png
  star: 5
Sanhua:
  image: ""
"#,
        )
        .unwrap();

        assert_eq!(
            catalog.resolve(&ItemId::from("Jinhsi")),
            AssetRef::Image("https://example.invalid/jinhsi.png".into())
        );
        assert_eq!(catalog.resolve(&ItemId::from("Sanhua")), AssetRef::Name("Sanhua".into()));
        assert_eq!(catalog.resolve(&ItemId::from("Unknown")), AssetRef::Name("Unknown".into()));
    }

    #[test]
    fn test_missing_catalog_is_config_error() {
        let err = CatalogResolver::load(Path::new("no/such/catalog.toml")).unwrap_err();
        assert!(matches!(&err, GachaError::InvalidConfig(msg) if msg.contains("no/such/catalog.toml")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_toml_catalog() {
        let catalog = CatalogResolver::from_toml_str(
            r#"
            [Verina]
            image = "assets/verina.png"
            "#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_resolve_outcomes_keeps_order() {
        let outcomes = vec![
            DrawOutcome {
                tier: 2,
                rarity: 3,
                item_id: ItemId::from("b"),
                resolved_from_featured: false,
                pity_count: None,
            },
            DrawOutcome {
                tier: 0,
                rarity: 5,
                item_id: ItemId::from("a"),
                resolved_from_featured: true,
                pity_count: Some(74),
            },
        ];
        let resolved = resolve_outcomes(&NameResolver, &outcomes);
        assert_eq!(resolved[0].asset, AssetRef::Name("b".into()));
        assert_eq!(resolved[1].outcome.pity_count, Some(74));
    }
}
