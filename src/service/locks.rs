//! Per-key mutual exclusion with a bounded wait

use ahash::AHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::error::{GachaError, Result};
use crate::store::StoreKey;

/// Held for the whole read-modify-write of one key
#[derive(Debug)]
pub struct KeyGuard {
    key: StoreKey,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &StoreKey {
        &self.key
    }
}

/// One async mutex per store key. Different keys never contend.
#[derive(Debug)]
pub struct KeyLocks {
    locks: Mutex<AHashMap<StoreKey, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl KeyLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(AHashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait up to the configured timeout for `key`. Callers that lose the
    /// race get `LockContention` instead of being queued indefinitely.
    pub async fn acquire(&self, key: &StoreKey) -> Result<KeyGuard> {
        let lock = {
            let mut map = self.locks.lock().await;
            // Entries only the map still references are idle
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(KeyGuard {
                key: key.clone(),
                _guard: guard,
            }),
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                tracing::warn!("Lock contention on {} after {}ms", key, waited_ms);
                Err(GachaError::LockContention {
                    key: key.to_string(),
                    waited_ms,
                })
            }
        }
    }

    /// Keys with a live lock entry (held or awaited)
    pub async fn active(&self) -> usize {
        let map = self.locks.lock().await;
        map.values().filter(|l| Arc::strong_count(l) > 1).count()
    }
}
