use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

/// In-process mutual exclusion keyed by version identifier.
///
/// Installs of the same version are serialized; different versions never
/// contend. Idle entries are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct VersionLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl VersionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, version: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(version.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
