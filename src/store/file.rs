//! JSON-file state store, one file per key

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::error::{GachaError, Result};
use crate::core::types::{BannerType, UserId};
use crate::pity::PityState;
use crate::store::{decode_state, encode_state, StateStore, StoreKey};

/// Stores each key as `<dir>/<key>.json`. Writes go to a temporary file
/// and are renamed into place, so a reader never sees a torn state.
#[derive(Debug, Clone)]
pub struct FileStore {
    namespace: String,
    dir: PathBuf,
}

impl FileStore {
    pub fn new(namespace: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self, user: &UserId, banner: BannerType) -> StoreKey {
        StoreKey::new(&self.namespace, banner, user)
    }

    /// File for a key. Bytes outside `[A-Za-z0-9-]` are escaped as `_xx`
    /// so distinct keys never share a file.
    pub fn path_for(&self, key: &StoreKey) -> PathBuf {
        let mut file_name = String::with_capacity(key.as_str().len());
        for byte in key.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                file_name.push(byte as char);
            } else {
                file_name.push_str(&format!("_{:02x}", byte));
            }
        }
        self.dir.join(format!("{}.json", file_name))
    }
}

fn unavailable(key: &StoreKey, action: &str, e: std::io::Error) -> GachaError {
    GachaError::store(format!("{} {}: {}", action, key, e))
}

impl StateStore for FileStore {
    async fn load(&self, user: &UserId, banner: BannerType) -> Result<PityState> {
        let key = self.key(user, banner);
        match tokio::fs::read_to_string(self.path_for(&key)).await {
            Ok(raw) => decode_state(&key, &raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PityState::new()),
            Err(e) => Err(unavailable(&key, "load", e)),
        }
    }

    async fn save(&self, user: &UserId, banner: BannerType, state: &PityState) -> Result<()> {
        let key = self.key(user, banner);
        let path = self.path_for(&key);
        let tmp = path.with_extension("json.tmp");
        let raw = encode_state(state)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| unavailable(&key, "save", e))?;
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| unavailable(&key, "save", e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| unavailable(&key, "save", e))?;
        Ok(())
    }

    async fn reset(&self, user: &UserId, banner: BannerType) -> Result<()> {
        let key = self.key(user, banner);
        match tokio::fs::remove_file(self.path_for(&key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(&key, "reset", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pity::Guarantee;
    use tempfile::tempdir;

    #[test]
    fn test_path_is_sanitised() {
        let store = FileStore::new("gacha:simulator", "/tmp/state");
        let key = store.key(&UserId::new("../evil"), BannerType::Weapon);
        let path = store.path_for(&key);
        assert_eq!(path, PathBuf::from("/tmp/state/gacha_3asimulator_3aweapon_3a_2e_2e_2fevil.json"));
    }

    #[tokio::test]
    async fn test_round_trip_and_reset() {
        let dir = tempdir().unwrap();
        let store = FileStore::new("ns", dir.path());
        let user = UserId::new("42");
        let state = PityState::new().with_counter(1, 6, Guarantee::Featured);

        assert!(store.load(&user, BannerType::Weapon).await.unwrap().is_zero());
        store.save(&user, BannerType::Weapon, &state).await.unwrap();
        assert_eq!(store.load(&user, BannerType::Weapon).await.unwrap(), state);

        store.reset(&user, BannerType::Weapon).await.unwrap();
        store.reset(&user, BannerType::Weapon).await.unwrap();
        assert!(store.load(&user, BannerType::Weapon).await.unwrap().is_zero());
    }
}
