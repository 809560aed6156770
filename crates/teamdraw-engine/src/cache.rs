use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::LoadError;
use crate::prize::PrizeConfigItem;

/// Backing read for the prize table.
#[async_trait]
pub trait PrizeTableSource: Send + Sync {
    async fn load_prize_table(&self) -> Result<Vec<PrizeConfigItem>, LoadError>;
}

#[derive(Default)]
struct Slot {
    value: Option<Arc<Vec<PrizeConfigItem>>>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn fresh(&self, now: Instant) -> Option<Arc<Vec<PrizeConfigItem>>> {
        match (&self.value, self.expires_at) {
            (Some(value), Some(expires_at)) if now < expires_at => Some(Arc::clone(value)),
            _ => None,
        }
    }
}

/// Time-bounded cache in front of the persisted prize table.
///
/// Admin edits become visible within one TTL unless `invalidate` is called.
pub struct PrizeTableCache {
    source: Arc<dyn PrizeTableSource>,
    ttl: Duration,
    slot: RwLock<Slot>,
}

impl PrizeTableCache {
    pub fn new(source: Arc<dyn PrizeTableSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(Slot::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self) -> Result<Arc<Vec<PrizeConfigItem>>, LoadError> {
        if let Some(value) = self.slot.read().await.fresh(Instant::now()) {
            return Ok(value);
        }

        let mut slot = self.slot.write().await;
        // Another task may have reloaded while we waited for the write lock.
        if let Some(value) = slot.fresh(Instant::now()) {
            return Ok(value);
        }

        let items = Arc::new(self.source.load_prize_table().await?);
        tracing::debug!(items = items.len(), "prize table reloaded");
        slot.value = Some(Arc::clone(&items));
        slot.expires_at = Some(Instant::now() + self.ttl);
        Ok(items)
    }

    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        slot.value = None;
        slot.expires_at = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::prize::PrizeKind;

    struct CountingSource {
        loads: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PrizeTableSource for CountingSource {
        async fn load_prize_table(&self) -> Result<Vec<PrizeConfigItem>, LoadError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LoadError::Invalid("boom".to_string()));
            }
            Ok(vec![PrizeConfigItem::new(PrizeKind::Lose, format!("load-{n}"), 1.0)])
        }
    }

    fn cache(fail: bool) -> (Arc<CountingSource>, PrizeTableCache) {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            fail,
        });
        let cache = PrizeTableCache::new(source.clone(), Duration::from_secs(30));
        (source, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn serves_cached_value_until_ttl() {
        let (source, cache) = cache(false);

        assert_eq!(cache.get().await.unwrap()[0].name, "load-0");
        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get().await.unwrap()[0].name, "load-0");
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get().await.unwrap()[0].name, "load-1");
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_reload() {
        let (source, cache) = cache(false);

        cache.get().await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.get().await.unwrap()[0].name, "load-1");
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_readers_share_one_reload() {
        let (source, cache) = cache(false);
        let cache = Arc::new(cache);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move { cache.get().await.map(|v| v.len()) }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 1);
        }
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_errors_are_not_cached() {
        let (source, cache) = cache(true);

        assert!(cache.get().await.is_err());
        assert!(cache.get().await.is_err());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }
}
