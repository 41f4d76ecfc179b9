use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::Clock;
use super::domain::ApplicationId;

struct Entry<V> {
    stored_at: DateTime<Utc>,
    value: V,
}

/// Per-application values that expire `ttl` after insertion.
pub struct ResultCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<ApplicationId, Entry<V>>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ApplicationId, Entry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - stored_at).to_std() {
            Ok(age) => age < self.ttl,
            // Stored "in the future" relative to the clock.
            Err(_) => true,
        }
    }

    pub fn insert(&self, application_id: ApplicationId, value: V) {
        let stored_at = self.clock.now();
        self.lock().insert(application_id, Entry { stored_at, value });
    }

    /// Returns a fresh value; an expired one is evicted on the way.
    pub fn get(&self, application_id: &ApplicationId) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let fresh = entries
            .get(application_id)
            .map(|entry| self.is_fresh(entry.stored_at, now))?;
        if fresh {
            entries.get(application_id).map(|entry| entry.value.clone())
        } else {
            entries.remove(application_id);
            None
        }
    }

    pub fn invalidate(&self, application_id: &ApplicationId) -> bool {
        self.lock().remove(application_id).is_some()
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry.stored_at, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::clock::FixedClock;
    use chrono::TimeZone;

    fn cache(clock: Arc<FixedClock>) -> ResultCache<String> {
        ResultCache::new(Duration::from_secs(300), clock)
    }

    fn id(raw: &str) -> ApplicationId {
        ApplicationId(raw.to_string())
    }

    #[test]
    fn values_expire_after_ttl() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let cache = cache(clock.clone());
        cache.insert(id("APP-1"), "first".to_string());

        clock.advance(chrono::Duration::seconds(299));
        assert_eq!(cache.get(&id("APP-1")).as_deref(), Some("first"));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.get(&id("APP-1")), None);
        assert!(cache.is_empty(), "expired entry evicted on read");
    }

    #[test]
    fn purge_only_drops_stale_entries() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        let cache = cache(clock.clone());
        cache.insert(id("old"), "old".to_string());
        clock.advance(chrono::Duration::seconds(200));
        cache.insert(id("new"), "new".to_string());
        clock.advance(chrono::Duration::seconds(150));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.invalidate(&id("new")));
        assert!(!cache.invalidate(&id("new")));
    }
}
