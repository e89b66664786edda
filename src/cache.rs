use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A map whose entries expire a fixed time after they were written.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Update the live entry for `key`, creating it with `default` first if
    /// needed. Creating an entry counts as a write; updating does not.
    pub fn update<R>(&self, key: K, default: impl FnOnce() -> V, f: impl FnOnce(&mut V) -> R) -> R {
        self.update_at(key, default, f, Instant::now())
    }

    pub fn invalidate(&self, key: &K) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub(crate) fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.purge(&mut entries, now);
        entries.insert(key, (now, value));
    }

    pub(crate) fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.purge(&mut entries, now);
        entries.get(key).map(|(_, value)| value.clone())
    }

    pub(crate) fn update_at<R>(
        &self,
        key: K,
        default: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
        now: Instant,
    ) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        self.purge(&mut entries, now);
        let (_, value) = entries.entry(key).or_insert_with(|| (now, default()));
        f(value)
    }

    fn purge(&self, entries: &mut HashMap<K, (Instant, V)>, now: Instant) {
        entries.retain(|_, (written, _)| now.saturating_duration_since(*written) < self.ttl);
    }
}
