//! TTL 기반 인메모리 캐시.
//!
//! 여러 요청이 동시에 읽고 쓸 수 있습니다. 만료된 항목은 조회 시 무시되고,
//! 백그라운드 정리 태스크가 주기적으로 제거합니다.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Entry<V> {
    value: V,
    /// `None`이면 만료되지 않음
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// TTL 캐시 저장소.
pub struct CacheStore<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    closed: CancellationToken,
}

impl<V: Clone + Send + Sync + 'static> CacheStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            closed: CancellationToken::new(),
        }
    }

    /// 살아 있는 항목을 조회합니다.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// 항목을 저장합니다. `ttl`이 0이면 만료되지 않습니다.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Entry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// 살아 있는 항목을 순회합니다. `visit`이 `false`를 반환하면 중단합니다.
    pub fn range(&self, mut visit: impl FnMut(&str, &V) -> bool) {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        for (key, entry) in entries.iter() {
            if entry.is_live(now) && !visit(key, &entry.value) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 만료된 항목을 제거하고 제거한 개수를 반환합니다.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// `interval`마다 만료 항목을 정리하는 태스크를 시작합니다. `close` 시 종료됩니다.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = store.closed.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.sweep();
                        if removed > 0 {
                            debug!(removed, "Swept expired cache entries");
                        }
                    }
                }
            }
        })
    }

    /// 정리 태스크를 멈추고 모든 항목을 해제합니다.
    pub fn close(&self) {
        self.closed.cancel();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = CacheStore::new();
        store.set("k", 1, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.get("k"), Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let store = CacheStore::new();
        store.set("k", "v", Duration::ZERO);

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(store.get("k"), Some("v"));
        assert_eq!(store.sweep(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_range() {
        let store = CacheStore::new();
        store.set("a", 1, Duration::ZERO);
        store.set("b", 2, Duration::ZERO);
        store.set("c", 3, Duration::ZERO);
        store.delete("b");

        let mut seen = 0;
        store.range(|_, _| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired() {
        let store = Arc::new(CacheStore::new());
        store.set("short", 1, Duration::from_secs(1));
        store.set("forever", 2, Duration::ZERO);
        let handle = store.spawn_sweeper(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.len(), 1);

        store.close();
        handle.await.unwrap();
        assert!(store.is_empty());
        assert!(store.is_closed());
    }
}
