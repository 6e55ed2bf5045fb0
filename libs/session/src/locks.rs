use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-sender mutex table serializing orchestrations for the same key.
///
/// Concurrent webhook calls for different senders proceed in parallel; two
/// calls for the same sender queue behind one lock so a renewal cannot race
/// a lookup and leave a mismatched entry in the store. Lock cells are
/// created lazily and kept for the process lifetime, one per sender seen.
#[derive(Default)]
pub struct KeyedLock {
    cells: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let cell = self
            .cells
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        cell.lock_owned().await
    }
}
