//! Explicit cache-aside helper: deterministic key from a scope plus its
//! arguments, TTL chosen by the caller, JSON values inside so any
//! serializable result can be stored. Callers own the control flow — check,
//! compute on miss, insert.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: DashMap::new() })
    }

    /// Deterministic key: `scope:arg1:arg2:...`.
    pub fn key(scope: &str, parts: &[&str]) -> String {
        let mut key = String::from(scope);
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }

    /// Returns the cached value if present and unexpired; expired entries are
    /// removed on access.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let expired = {
            let entry = self.entries.get(key)?;
            if entry.expires_at <= Instant::now() {
                true
            } else {
                return serde_json::from_value(entry.value.clone()).ok();
            }
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Ok(value) = serde_json::to_value(value) {
            self.entries
                .insert(key.to_string(), CacheEntry { value, expires_at: Instant::now() + ttl });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Called opportunistically by long-running
    /// tasks; correctness doesn't depend on it.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}
