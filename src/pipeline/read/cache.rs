use crate::error::Result;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Something a successful write must invalidate
pub trait Invalidate: Send + Sync {
    fn invalidate(&self);
}

struct Entry<T> {
    value: Arc<T>,
    built_at: Instant,
}

struct Slot<T> {
    entry: Option<Entry<T>>,
    /// Bumped by every invalidation; a build started under an older generation is not stored
    generation: u64,
}

/// Single-entry memo with a time-to-live.
///
/// Two callers that miss together will both run the builder. A build that overlaps an
/// `invalidate()` is returned to its caller but never cached, so the next read rebuilds.
/// A failed build leaves the current entry alone.
pub struct ResultCache<T> {
    ttl: Duration,
    slot: Mutex<Slot<T>>,
}

impl<T: Send + Sync> ResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(Slot {
                entry: None,
                generation: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // the slot is always left consistent, so a poisoned lock is still usable
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The cached value if it is still within its TTL
    pub fn peek(&self) -> Option<Arc<T>> {
        self.lock()
            .entry
            .as_ref()
            .filter(|entry| entry.built_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn get_or_build<F, Fut>(&self, builder: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = {
            let slot = self.lock();
            let fresh = slot
                .entry
                .as_ref()
                .filter(|entry| entry.built_at.elapsed() < self.ttl)
                .map(|entry| entry.value.clone());
            if let Some(value) = fresh {
                metrics::counter!("territorial_cache_hits_total").increment(1);
                return Ok(value);
            }
            slot.generation
        };

        metrics::counter!("territorial_cache_misses_total").increment(1);
        debug!("Cache miss, rebuilding");
        let value = Arc::new(builder().await?);

        let mut slot = self.lock();
        if slot.generation == generation {
            slot.entry = Some(Entry {
                value: value.clone(),
                built_at: Instant::now(),
            });
        } else {
            debug!("Cache invalidated during rebuild, result not stored");
        }
        Ok(value)
    }

    pub fn invalidate(&self) {
        let mut slot = self.lock();
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        debug!("Cache invalidated");
    }
}

impl<T: Send + Sync> Invalidate for ResultCache<T> {
    fn invalidate(&self) {
        ResultCache::invalidate(self);
    }
}
