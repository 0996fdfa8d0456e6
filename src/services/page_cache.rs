// src/services/page_cache.rs - time-bounded cache for rendered listings
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use actix_web::web::Bytes;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_TTL_SECS: i64 = 20;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct CachedPage {
    content: Bytes,
    expires_at: DateTime<Utc>,
}

/// Rendered pages keyed by listing URL. Writes to the store do not evict;
/// an entry lives until its TTL runs out or [`PageCache::clear`] is called.
pub struct PageCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<String, CachedPage>>,
}

impl PageCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, CachedPage>> {
        // a poisoned map only holds stale bytes, keep serving it
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let mut slots = self.slots();
        let expired = match slots.get(key) {
            Some(page) if now < page.expires_at => return Some(page.content.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            slots.remove(key);
        }
        None
    }

    pub fn put(&self, key: &str, content: Bytes) {
        let expires_at = self.clock.now() + self.ttl;
        self.slots()
            .insert(key.to_string(), CachedPage { content, expires_at });
    }

    pub fn clear(&self) {
        self.slots().clear();
    }
}
