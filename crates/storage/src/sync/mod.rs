#![forbid(unsafe_code)]

//! Read → mutate → write → invalidate, as one call per user action.
//!
//! Mutations always start from a fresh store read, never from the cache, and
//! write back with the revision that was read. A concurrent writer therefore
//! surfaces as [`SyncError::Conflict`] instead of being silently overwritten.
//! Caches are only invalidated after a successful write.

mod templates;

use crate::cache::{CollectionCache, KvBackend, TtlCache};
use crate::config::SyncConfig;
use crate::store::{
    CATEGORIES_FIELD, DocumentStore, FieldMap, StoreError, WorkspaceDocument,
};
use cf_core::clock::Clock;
use cf_core::ids::WorkspaceId;
use cf_core::tree::{Category, CategoryTree, MutationOutcome, TreeMutation};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store: {0}")]
    Store(#[source] StoreError),
    #[error("workspace changed concurrently (expected revision {expected}, found {actual})")]
    Conflict { expected: i64, actual: i64 },
    #[error("malformed workspace document: {0}")]
    Document(#[from] serde_json::Error),
    /// The write went through (at `revision`) but a cache entry could not be
    /// evicted, so cached reads may be stale until the ttl runs out.
    #[error("written at revision {revision} but cache invalidation failed: {source}")]
    Invalidation {
        revision: i64,
        #[source]
        source: StoreError,
    },
    /// A paired record/tree operation failed and undoing the record step also
    /// failed.
    #[error("template {template_id} left inconsistent with the tree: {source}")]
    Inconsistent {
        template_id: String,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    /// Revision of the write that did land, if any.
    pub fn committed_revision(&self) -> Option<i64> {
        match self {
            Self::Invalidation { revision, .. } => Some(*revision),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RevisionMismatch { expected, actual } => {
                Self::Conflict { expected, actual }
            }
            other => Self::Store(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    WorkspaceNotFound,
    TargetNotFound,
    DuplicateId,
    TemplateNotFound,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkspaceNotFound => "workspace_not_found",
            Self::TargetNotFound => "target_not_found",
            Self::DuplicateId => "duplicate_id",
            Self::TemplateNotFound => "template_not_found",
        }
    }

    fn from_outcome(outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::DuplicateId => Self::DuplicateId,
            MutationOutcome::Applied | MutationOutcome::NotFound => Self::TargetNotFound,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Persisted {
    pub tree: CategoryTree,
    pub revision: i64,
    /// Id of the category or template the operation created.
    pub created_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    Persisted(Persisted),
    Skipped(SkipReason),
}

impl SyncOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted(_))
    }

    pub fn persisted(&self) -> Option<&Persisted> {
        match self {
            Self::Persisted(persisted) => Some(persisted),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Persisted(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

/// Cache entries to drop after a successful write, beyond the workspace
/// document itself.
#[derive(Clone, Copy, Debug)]
struct Touched<'a> {
    collection: &'a str,
    id: &'a str,
}

/// Orchestrates tree edits for one workspace against a store and two explicit
/// cache instances.
#[derive(Debug)]
pub struct WorkspaceSync<S, K, C> {
    store: S,
    workspace: WorkspaceId,
    documents: TtlCache<K, C>,
    collections: CollectionCache<K, C>,
}

impl<S: DocumentStore, K: KvBackend, C: Clock> WorkspaceSync<S, K, C> {
    pub fn new(
        store: S,
        workspace: WorkspaceId,
        documents: TtlCache<K, C>,
        collections: CollectionCache<K, C>,
    ) -> Self {
        Self {
            store,
            workspace,
            documents,
            collections,
        }
    }

    /// Builds both caches over the same backend and clock.
    pub fn with_config(
        store: S,
        workspace: WorkspaceId,
        kv: K,
        clock: C,
        config: &SyncConfig,
    ) -> Self
    where
        K: Clone,
        C: Clone,
    {
        let documents = TtlCache::new(kv.clone(), clock.clone(), config.workspace_ttl_minutes);
        let generic = TtlCache::new(kv, clock, config.generic_ttl_minutes);
        let collections = CollectionCache::new(generic, config.batch_limit);
        Self::new(store, workspace, documents, collections)
    }

    pub fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn document_cache_key(&self) -> String {
        format!("workspace:{}", self.workspace.as_str())
    }

    /// Workspace document, served from the workspace cache while it is live.
    pub fn workspace_document(&self) -> Result<Option<WorkspaceDocument>, SyncError> {
        let key = self.document_cache_key();
        if let Some(document) = self.documents.get::<WorkspaceDocument>(&key) {
            tracing::debug!(workspace = %self.workspace, "workspace cache hit");
            return Ok(Some(document));
        }

        tracing::debug!(workspace = %self.workspace, "fetching fresh workspace document");
        let Some(document) = self.store.workspace_get(&self.workspace)? else {
            tracing::warn!(workspace = %self.workspace, "workspace document not found");
            return Ok(None);
        };
        if let Err(err) = self.documents.put(&key, &document) {
            tracing::warn!(
                workspace = %self.workspace,
                error = %err,
                "failed to cache workspace document"
            );
        }
        Ok(Some(document))
    }

    pub fn workspace_field(&self, name: &str) -> Result<Option<Value>, SyncError> {
        Ok(self
            .workspace_document()?
            .and_then(|document| document.field(name).cloned()))
    }

    pub fn categories(&self) -> Result<Option<CategoryTree>, SyncError> {
        match self.workspace_document()? {
            Some(document) => Ok(Some(document.categories()?)),
            None => Ok(None),
        }
    }

    pub fn apply_and_persist(&mut self, mutation: &TreeMutation) -> Result<SyncOutcome, SyncError> {
        self.persist_with(mutation.kind(), &[], |tree, _, _| Ok(mutation.apply(tree)))
    }

    /// Adds a category named `name` with a freshly drawn id that is unique in
    /// the current tree.
    pub fn create_category(
        &mut self,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let mut created = None;
        let outcome = self.persist_with("create_category", &[], |tree, _, _| {
            let category = Category::new(tree.unique_category_id(), name);
            created = Some(category.id.clone());
            Ok(tree.insert_category(parent_id, category))
        })?;
        Ok(with_created_id(outcome, created))
    }

    pub fn rename_category(
        &mut self,
        category_id: &str,
        name: &str,
    ) -> Result<SyncOutcome, SyncError> {
        self.apply_and_persist(&TreeMutation::RenameCategory {
            category_id: category_id.to_string(),
            name: name.to_string(),
        })
    }

    /// Removes the category and its subtree. Template records referenced from
    /// the subtree are kept.
    pub fn delete_category(&mut self, category_id: &str) -> Result<SyncOutcome, SyncError> {
        self.apply_and_persist(&TreeMutation::RemoveCategory {
            category_id: category_id.to_string(),
        })
    }

    /// The single read-modify-write cycle every tree operation goes through.
    ///
    /// `mutate` gets the fresh tree, the document it came from, and a map for
    /// extra top-level fields to write in the same update.
    fn persist_with<F>(
        &mut self,
        action: &str,
        touched: &[Touched<'_>],
        mutate: F,
    ) -> Result<SyncOutcome, SyncError>
    where
        F: FnOnce(
            &mut CategoryTree,
            &WorkspaceDocument,
            &mut FieldMap,
        ) -> Result<MutationOutcome, SyncError>,
    {
        let Some(document) = self.store.workspace_get(&self.workspace)? else {
            tracing::warn!(
                workspace = %self.workspace,
                action,
                "workspace document not found; skipped"
            );
            return Ok(SyncOutcome::Skipped(SkipReason::WorkspaceNotFound));
        };

        let mut tree = document.categories()?;
        let mut fields = FieldMap::new();
        let outcome = mutate(&mut tree, &document, &mut fields)?;
        if !outcome.is_applied() {
            tracing::warn!(
                workspace = %self.workspace,
                action,
                outcome = outcome.as_str(),
                "mutation did not apply; skipped"
            );
            return Ok(SyncOutcome::Skipped(SkipReason::from_outcome(outcome)));
        }

        fields.insert(CATEGORIES_FIELD.to_string(), serde_json::to_value(&tree)?);
        let revision = self
            .store
            .workspace_update_fields(&self.workspace, fields, Some(document.revision))
            .map_err(|err| {
                tracing::warn!(
                    workspace = %self.workspace,
                    action,
                    error = %err,
                    "workspace write failed"
                );
                SyncError::from(err)
            })?;

        self.invalidate(touched)
            .map_err(|source| SyncError::Invalidation { revision, source })?;

        tracing::info!(workspace = %self.workspace, action, revision, "workspace updated");
        Ok(SyncOutcome::Persisted(Persisted {
            tree,
            revision,
            created_id: None,
        }))
    }

    fn invalidate(&self, touched: &[Touched<'_>]) -> Result<(), StoreError> {
        self.documents.evict(&self.document_cache_key())?;
        for entry in touched {
            self.collections
                .invalidate(&self.workspace, entry.collection, entry.id)?;
        }
        Ok(())
    }
}

fn with_created_id(outcome: SyncOutcome, created_id: Option<String>) -> SyncOutcome {
    match outcome {
        SyncOutcome::Persisted(mut persisted) => {
            persisted.created_id = created_id;
            SyncOutcome::Persisted(persisted)
        }
        skipped => skipped,
    }
}
