//! Engine configuration with documented defaults
//!
//! Everything the service layer needs to know about where pools and state
//! live, how batches are sized and how long to wait for a per-user lock.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{GachaError, Result};
use crate::core::types::BannerType;

/// When pity state is written back to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Save after every draw. A failure mid-batch keeps every draw up to
    /// the last successful save.
    PerDraw,
    /// Save once when the batch finishes. A failure discards the batch.
    PerBatch,
}

impl Default for PersistPolicy {
    fn default() -> Self {
        PersistPolicy::PerDraw
    }
}

/// Configuration for the gacha service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix of every store key: `<namespace>:<banner>:<user>`
    pub namespace: String,

    /// Directory holding one pool document per banner type
    /// (`role.toml`, `weapon.toml`, or the legacy `.yaml` form)
    pub pool_dir: PathBuf,

    /// Directory used by the file-backed state store
    pub state_dir: PathBuf,

    /// Optional item asset catalog consulted after a batch completes
    pub catalog_path: Option<PathBuf>,

    /// How long a request waits for the per-(user, banner) lock before
    /// giving up with `LockContention`
    pub lock_timeout_ms: u64,

    /// Draws in one regular batch ("ten-pull")
    pub batch_size: usize,

    /// Sub-batches in one large batch ("hundred-pull" = 10 x 10)
    pub large_batch_rounds: usize,

    /// Most draws a single request may ask for, counting every round
    pub max_batch_draws: usize,

    pub persist: PersistPolicy,

    /// Fixed RNG seed. Unset means seeded from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "gacha:simulator".into(),
            pool_dir: PathBuf::from("data/pools"),
            state_dir: PathBuf::from("data/state"),
            catalog_path: None,
            lock_timeout_ms: 2000,
            batch_size: 10,
            large_batch_rounds: 10,
            max_batch_draws: 1000,
            persist: PersistPolicy::PerDraw,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GachaError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            GachaError::Toml(e) => GachaError::config(format!("{}: {}", path.display(), e)),
            GachaError::InvalidConfig(msg) => GachaError::config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from environment variables
    ///
    /// Optional: GACHA_CONFIG (path to a TOML file, defaults to `gacha.toml`;
    /// ignored if the file does not exist)
    /// Optional: GACHA_SEED (overrides `seed`)
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("GACHA_CONFIG").unwrap_or_else(|_| "gacha.toml".into());
        let path = Path::new(&path);
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(seed) = std::env::var("GACHA_SEED") {
            let seed = seed
                .parse::<u64>()
                .map_err(|e| GachaError::config(format!("GACHA_SEED: {}", e)))?;
            config.seed = Some(seed);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(GachaError::config("namespace must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(GachaError::config("batch_size must be at least 1"));
        }
        if self.large_batch_rounds == 0 {
            return Err(GachaError::config("large_batch_rounds must be at least 1"));
        }
        let large = self.batch_size.checked_mul(self.large_batch_rounds);
        if !matches!(large, Some(n) if n <= self.max_batch_draws) {
            return Err(GachaError::config(format!(
                "large batch of {}x{} draws exceeds max_batch_draws ({})",
                self.large_batch_rounds, self.batch_size, self.max_batch_draws
            )));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Path of the native pool document for a banner type
    pub fn pool_path(&self, banner: BannerType) -> PathBuf {
        self.pool_dir.join(format!("{}.toml", banner.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            namespace = "waves:simulator"
            lock_timeout_ms = 500
            persist = "per_batch"
            "#,
        )
        .unwrap();

        assert_eq!(config.namespace, "waves:simulator");
        assert_eq!(config.lock_timeout(), Duration::from_millis(500));
        assert_eq!(config.persist, PersistPolicy::PerBatch);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.large_batch_rounds, 10);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(EngineConfig::from_toml_str("batch_size = 0").is_err());
    }

    #[test]
    fn test_large_batch_must_fit_draw_limit() {
        assert!(EngineConfig::from_toml_str("max_batch_draws = 99").is_err());
        assert!(EngineConfig::from_toml_str("max_batch_draws = 100").is_ok());
        let huge = "batch_size = 4611686018427387904\nlarge_batch_rounds = 4\nmax_batch_draws = 9223372036854775807";
        assert!(EngineConfig::from_toml_str(huge).is_err());
    }

    #[test]
    fn test_missing_file_is_config_error_with_path() {
        let err = EngineConfig::load(Path::new("does/not/exist/gacha.toml")).unwrap_err();
        match &err {
            GachaError::InvalidConfig(msg) => assert!(msg.contains("does/not/exist/gacha.toml")),
            other => panic!("expected config error, got {:?}", other),
        }
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_pool_path_per_banner() {
        let config = EngineConfig::default();
        assert_eq!(config.pool_path(BannerType::Weapon), PathBuf::from("data/pools/weapon.toml"));
    }
}
