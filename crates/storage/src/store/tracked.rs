#![forbid(unsafe_code)]

use super::{DocumentStore, FieldMap, StoreError, StoredDocument, WorkspaceDocument};
use crate::cache::KvBackend;
use crate::usage::{UsageKind, UsageTracker};
use cf_core::ids::WorkspaceId;

/// Counts the traffic of an inner store under one usage scope.
///
/// Reads count documents returned, not calls. A failure to record usage is
/// logged and never fails the store call itself.
#[derive(Debug)]
pub struct TrackedStore<S, K> {
    inner: S,
    usage: UsageTracker<K>,
    scope: String,
}

impl<S: DocumentStore, K: KvBackend> TrackedStore<S, K> {
    pub fn new(inner: S, usage: UsageTracker<K>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            usage,
            scope: scope.into(),
        }
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn usage(&self) -> &UsageTracker<K> {
        &self.usage
    }

    fn record(&self, kind: UsageKind, count: u64) {
        if count == 0 {
            return;
        }
        if let Err(err) = self.usage.track(&self.scope, kind, count) {
            tracing::warn!(scope = %self.scope, error = %err, "failed to record usage");
        }
    }
}

impl<S: DocumentStore, K: KvBackend> DocumentStore for TrackedStore<S, K> {
    fn workspace_get(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<WorkspaceDocument>, StoreError> {
        let out = self.inner.workspace_get(workspace)?;
        self.record(UsageKind::Read, 1);
        Ok(out)
    }

    fn workspace_update_fields(
        &mut self,
        workspace: &WorkspaceId,
        fields: FieldMap,
        expected_revision: Option<i64>,
    ) -> Result<i64, StoreError> {
        let revision = self
            .inner
            .workspace_update_fields(workspace, fields, expected_revision)?;
        self.record(UsageKind::Write, 1);
        Ok(revision)
    }

    fn document_get(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let out = self.inner.document_get(workspace, collection, id)?;
        self.record(UsageKind::Read, 1);
        Ok(out)
    }

    fn documents_in(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let out = self.inner.documents_in(workspace, collection, ids)?;
        self.record(UsageKind::Read, out.len() as u64);
        Ok(out)
    }

    fn document_add(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        fields: FieldMap,
    ) -> Result<String, StoreError> {
        let id = self.inner.document_add(workspace, collection, fields)?;
        self.record(UsageKind::Write, 1);
        Ok(id)
    }

    fn document_set(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
        fields: FieldMap,
    ) -> Result<(), StoreError> {
        self.inner.document_set(workspace, collection, id, fields)?;
        self.record(UsageKind::Write, 1);
        Ok(())
    }

    fn document_delete(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        let deleted = self.inner.document_delete(workspace, collection, id)?;
        self.record(UsageKind::Delete, u64::from(deleted));
        Ok(deleted)
    }
}
