#![forbid(unsafe_code)]

use super::KvBackend;
use crate::StoreError;
use cf_core::clock::Clock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub timestamp: i64,
    pub value: T,
}

/// One cache instance: a backend, a clock and a default ttl.
#[derive(Debug)]
pub struct TtlCache<K, C> {
    kv: K,
    clock: C,
    ttl_minutes: i64,
}

impl<K: KvBackend, C: Clock> TtlCache<K, C> {
    pub fn new(kv: K, clock: C, ttl_minutes: i64) -> Self {
        Self {
            kv,
            clock,
            ttl_minutes,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Stores `{timestamp: now, value}`, replacing any previous entry.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let entry = CacheEntry {
            timestamp: self.clock.now_ms(),
            value,
        };
        self.kv.kv_set(key, &serde_json::to_string(&entry)?)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_with_ttl(key, self.ttl_minutes)
    }

    pub fn get_with_ttl<T: DeserializeOwned>(&self, key: &str, ttl_minutes: i64) -> Option<T> {
        self.entry_with_ttl(key, ttl_minutes).map(|entry| entry.value)
    }

    /// Like [`TtlCache::get`] but keeps the write timestamp.
    pub fn entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entry_with_ttl(key, self.ttl_minutes)
    }

    /// A live entry has `now - timestamp < ttl`. Backend errors and entries
    /// that no longer decode count as misses.
    pub fn entry_with_ttl<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl_minutes: i64,
    ) -> Option<CacheEntry<T>> {
        let raw = match self.kv.kv_get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(key, error = %err, "unreadable cache entry; treating as miss");
                return None;
            }
        };

        let ttl_ms = ttl_minutes.saturating_mul(60_000);
        let age_ms = self.clock.now_ms().saturating_sub(entry.timestamp);
        if age_ms < ttl_ms {
            Some(entry)
        } else {
            tracing::debug!(key, age_ms, ttl_ms, "cache entry expired");
            None
        }
    }

    pub fn evict(&self, key: &str) -> Result<(), StoreError> {
        self.kv.kv_remove(key)
    }
}
