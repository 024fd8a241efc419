//! In-memory TTL cache for search responses

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A process-local key/value cache whose entries expire after a fixed TTL
///
/// A zero TTL stores nothing useful: every lookup misses.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Insert a value, dropping any entries that have already expired
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| now < entry.expires_at);
        entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
