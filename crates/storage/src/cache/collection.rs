#![forbid(unsafe_code)]

use super::{KvBackend, TtlCache};
use crate::store::{CollectionIndex, DocumentStore, FieldMap, MAX_IN_QUERY_IDS, StoreError};
use cf_core::clock::Clock;
use cf_core::ids::WorkspaceId;
use std::collections::{BTreeMap, BTreeSet};

/// Per-document cache for one or more collections, keyed by document id.
///
/// An entry is reused while its ttl holds and it was fetched after the last
/// update recorded in the collection index; everything else is refetched in
/// batches of at most `batch_limit` ids.
#[derive(Debug)]
pub struct CollectionCache<K, C> {
    entries: TtlCache<K, C>,
    batch_limit: usize,
}

impl<K: KvBackend, C: Clock> CollectionCache<K, C> {
    pub fn new(entries: TtlCache<K, C>, batch_limit: usize) -> Self {
        Self {
            entries,
            batch_limit: batch_limit.clamp(1, MAX_IN_QUERY_IDS),
        }
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    pub fn now_ms(&self) -> i64 {
        self.entries.now_ms()
    }

    /// Resolves `ids` to documents. Ids the store does not have are left out of
    /// the result. Duplicate ids are fetched once.
    pub fn resolve<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        workspace: &WorkspaceId,
        collection: &str,
        ids: &[String],
        index: &CollectionIndex,
    ) -> Result<BTreeMap<String, FieldMap>, StoreError> {
        let mut out = BTreeMap::new();
        let mut seen = BTreeSet::new();
        let mut pending = Vec::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let key = entry_key(workspace, collection, id);
            match self.entries.entry::<FieldMap>(&key) {
                Some(entry) if index.is_fresh(id, entry.timestamp) => {
                    out.insert(id.clone(), entry.value);
                }
                _ => pending.push(id.clone()),
            }
        }

        tracing::debug!(
            collection,
            cached = out.len(),
            pending = pending.len(),
            "resolving collection documents"
        );

        for batch in pending.chunks(self.batch_limit) {
            let documents = store.documents_in(workspace, collection, batch)?;
            if documents.len() < batch.len() {
                tracing::warn!(
                    collection,
                    requested = batch.len(),
                    found = documents.len(),
                    "some documents were not found"
                );
            }
            for document in documents {
                let key = entry_key(workspace, collection, &document.id);
                if let Err(err) = self.entries.put(&key, &document.fields) {
                    tracing::warn!(key = %key, error = %err, "failed to cache document");
                }
                out.insert(document.id, document.fields);
            }
        }

        Ok(out)
    }

    pub fn invalidate(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        self.entries.evict(&entry_key(workspace, collection, id))
    }
}

fn entry_key(workspace: &WorkspaceId, collection: &str, id: &str) -> String {
    format!("doc:{}/{collection}/{id}", workspace.as_str())
}
