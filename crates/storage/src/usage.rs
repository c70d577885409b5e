#![forbid(unsafe_code)]

use crate::StoreError;
use crate::cache::KvBackend;
use serde::{Deserialize, Serialize};

pub const USAGE_KEY: &str = "dbUsage";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeUsage {
    pub scope: String,
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageKind {
    Read,
    Write,
    Delete,
}

/// Read/write/delete counters per scope, persisted under [`USAGE_KEY`].
///
/// Snapshots list the configured `order` first, then any other scope in the
/// order it was first seen.
#[derive(Debug)]
pub struct UsageTracker<K> {
    kv: K,
    order: Vec<String>,
}

impl<K: KvBackend> UsageTracker<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            order: Vec::new(),
        }
    }

    pub fn with_order<I, S>(kv: K, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kv,
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn init_scope(&self, scope: &str) -> Result<(), StoreError> {
        self.update(scope, |_| {})
    }

    pub fn track_read(&self, scope: &str, count: u64) -> Result<(), StoreError> {
        self.track(scope, UsageKind::Read, count)
    }

    pub fn track_write(&self, scope: &str, count: u64) -> Result<(), StoreError> {
        self.track(scope, UsageKind::Write, count)
    }

    pub fn track_delete(&self, scope: &str, count: u64) -> Result<(), StoreError> {
        self.track(scope, UsageKind::Delete, count)
    }

    pub fn track(&self, scope: &str, kind: UsageKind, count: u64) -> Result<(), StoreError> {
        self.update(scope, |usage| {
            let counter = match kind {
                UsageKind::Read => &mut usage.reads,
                UsageKind::Write => &mut usage.writes,
                UsageKind::Delete => &mut usage.deletes,
            };
            *counter = counter.saturating_add(count);
        })?;
        tracing::trace!(scope, ?kind, count, "usage tracked");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Vec<ScopeUsage>, StoreError> {
        let Some(raw) = self.kv.kv_get(USAGE_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(usage) => Ok(usage),
            Err(err) => {
                tracing::warn!(error = %err, "unreadable usage data; starting over");
                Ok(Vec::new())
            }
        }
    }

    pub fn scope(&self, scope: &str) -> Result<Option<ScopeUsage>, StoreError> {
        Ok(self.snapshot()?.into_iter().find(|usage| usage.scope == scope))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.kv_remove(USAGE_KEY)
    }

    fn update(&self, scope: &str, edit: impl FnOnce(&mut ScopeUsage)) -> Result<(), StoreError> {
        let mut usage = self.snapshot()?;
        let index = match usage.iter().position(|entry| entry.scope == scope) {
            Some(index) => index,
            None => {
                usage.push(ScopeUsage {
                    scope: scope.to_string(),
                    ..ScopeUsage::default()
                });
                usage.len() - 1
            }
        };
        edit(&mut usage[index]);
        self.save(usage)
    }

    fn save(&self, usage: Vec<ScopeUsage>) -> Result<(), StoreError> {
        let mut ordered = Vec::with_capacity(usage.len());
        let mut rest = usage;
        for scope in &self.order {
            if let Some(pos) = rest.iter().position(|entry| &entry.scope == scope) {
                ordered.push(rest.remove(pos));
            }
        }
        ordered.extend(rest);
        self.kv.kv_set(USAGE_KEY, &serde_json::to_string(&ordered)?)
    }
}
