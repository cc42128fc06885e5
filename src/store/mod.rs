//! Pity state persistence
//!
//! Stores are keyed by (user, banner) and serialise `PityState` as JSON
//! under `<namespace>:<banner>:<user>`. Mutual exclusion between batches
//! of the same key is the service layer's job (see `service::KeyLocks`);
//! a store only has to make each individual write atomic.

mod file;
mod memory;

use std::fmt;
use std::future::Future;

use crate::core::error::{GachaError, Result};
use crate::core::types::{BannerType, UserId};
use crate::pity::{LegacyPityRecord, PityState};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Fully qualified key of one persisted pity state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(namespace: &str, banner: BannerType, user: &UserId) -> Self {
        Self(format!("{}:{}:{}", namespace, banner.as_str(), user))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load/save/reset of pity state
///
/// `load` returns the zero state when nothing is stored. `reset` is
/// idempotent.
pub trait StateStore: Send + Sync {
    fn load(&self, user: &UserId, banner: BannerType) -> impl Future<Output = Result<PityState>> + Send;

    fn save(&self, user: &UserId, banner: BannerType, state: &PityState) -> impl Future<Output = Result<()>> + Send;

    fn reset(&self, user: &UserId, banner: BannerType) -> impl Future<Output = Result<()>> + Send;
}

pub(crate) fn encode_state(state: &PityState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Decode a stored value. Flat legacy bot records are accepted and
/// converted.
pub(crate) fn decode_state(key: &StoreKey, raw: &str) -> Result<PityState> {
    if let Ok(record) = serde_json::from_str::<LegacyPityRecord>(raw) {
        tracing::debug!("Converted legacy pity record at {}", key);
        return Ok(PityState::from(record));
    }
    serde_json::from_str::<PityState>(raw)
        .map_err(|e| GachaError::store(format!("corrupt state at {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pity::Guarantee;

    #[test]
    fn test_key_layout() {
        let key = StoreKey::new("waves:simulator", BannerType::Character, &UserId::new("10001"));
        assert_eq!(key.as_str(), "waves:simulator:role:10001");
    }

    #[test]
    fn test_decode_native_and_legacy() {
        let key = StoreKey::new("ns", BannerType::Weapon, &UserId::new("u"));
        let state = PityState::new().with_counter(0, 5, Guarantee::Featured);
        let raw = encode_state(&state).unwrap();
        assert_eq!(decode_state(&key, &raw).unwrap(), state);

        let legacy = r#"{"five_star_time":7,"five_star_other":true,"four_star_time":2,"four_star_other":false}"#;
        let converted = decode_state(&key, legacy).unwrap();
        assert_eq!(converted.draws_since_hit(0), 7);
        assert_eq!(converted.guarantee(1), Guarantee::Featured);
    }

    #[test]
    fn test_decode_garbage_is_store_error() {
        let key = StoreKey::new("ns", BannerType::Weapon, &UserId::new("u"));
        let err = decode_state(&key, "not json").unwrap_err();
        assert!(matches!(err, GachaError::StateStoreUnavailable(_)));
    }
}
