#![forbid(unsafe_code)]

//! Local caches in front of the document store.
//!
//! Everything here sits on a [`KvBackend`]: a process-local string key/value
//! surface. [`TtlCache`] stamps each entry with the time it was written and
//! treats it as absent once older than its ttl; expiry is only checked on
//! read. [`CollectionCache`] layers per-document freshness on top, driven by
//! the `lastUpdated` index kept in the workspace document.

mod collection;
mod sqlite_kv;
mod ttl;

pub use collection::CollectionCache;
pub use sqlite_kv::SqliteKv;
pub use ttl::{CacheEntry, TtlCache};

use crate::StoreError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub trait KvBackend {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn kv_remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<K: KvBackend + ?Sized> KvBackend for &K {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).kv_get(key)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).kv_set(key, value)
    }

    fn kv_remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).kv_remove(key)
    }
}

impl<K: KvBackend + ?Sized> KvBackend for Rc<K> {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).kv_get(key)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).kv_set(key, value)
    }

    fn kv_remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).kv_remove(key)
    }
}

/// In-memory backend; gone with the process.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvBackend for MemoryKv {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
