//! In-process state store

use ahash::AHashMap;
use tokio::sync::RwLock;

use crate::core::error::Result;
use crate::core::types::{BannerType, UserId};
use crate::pity::PityState;
use crate::store::{decode_state, encode_state, StateStore, StoreKey};

/// Serialised states in a map, like a key-value cache with no expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespace: String,
    entries: RwLock<AHashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(AHashMap::new()),
        }
    }

    pub fn key(&self, user: &UserId, banner: BannerType) -> StoreKey {
        StoreKey::new(&self.namespace, banner, user)
    }

    /// Store a raw serialised value, e.g. an imported legacy record
    pub async fn put_raw(&self, key: StoreKey, raw: impl Into<String>) {
        self.entries.write().await.insert(key, raw.into());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl StateStore for MemoryStore {
    async fn load(&self, user: &UserId, banner: BannerType) -> Result<PityState> {
        let key = self.key(user, banner);
        match self.entries.read().await.get(&key) {
            Some(raw) => decode_state(&key, raw),
            None => Ok(PityState::new()),
        }
    }

    async fn save(&self, user: &UserId, banner: BannerType, state: &PityState) -> Result<()> {
        let raw = encode_state(state)?;
        self.entries.write().await.insert(self.key(user, banner), raw);
        Ok(())
    }

    async fn reset(&self, user: &UserId, banner: BannerType) -> Result<()> {
        self.entries.write().await.remove(&self.key(user, banner));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pity::Guarantee;

    #[tokio::test]
    async fn test_load_missing_is_zero() {
        let store = MemoryStore::new("test");
        let state = store.load(&UserId::new("a"), BannerType::Character).await.unwrap();
        assert!(state.is_zero());
    }

    #[tokio::test]
    async fn test_save_load_reset() {
        let store = MemoryStore::new("test");
        let user = UserId::new("a");
        let state = PityState::new().with_counter(0, 33, Guarantee::Featured);

        store.save(&user, BannerType::Character, &state).await.unwrap();
        assert_eq!(store.load(&user, BannerType::Character).await.unwrap(), state);
        // Banners are independent
        assert!(store.load(&user, BannerType::Weapon).await.unwrap().is_zero());

        store.reset(&user, BannerType::Character).await.unwrap();
        store.reset(&user, BannerType::Character).await.unwrap();
        assert!(store.load(&user, BannerType::Character).await.unwrap().is_zero());
        assert!(store.is_empty().await);
    }
}
