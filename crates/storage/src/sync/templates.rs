#![forbid(unsafe_code)]

use super::{SkipReason, SyncError, SyncOutcome, Touched, WorkspaceSync, with_created_id};
use crate::cache::KvBackend;
use crate::store::{
    CollectionIndex, DocumentStore, FieldMap, TEMPLATES_COLLECTION, TemplateRecord,
};
use cf_core::clock::Clock;
use cf_core::tree::{MutationOutcome, TemplateRef};
use std::collections::BTreeMap;

/// Template records live in their own collection; the tree only holds
/// `{id, name}` references. Each operation here pairs a record write with a
/// tree write, and undoes the record write when the tree write does not land.
impl<S: DocumentStore, K: KvBackend, C: Clock> WorkspaceSync<S, K, C> {
    /// Creates an empty template record and attaches it to `category_id`.
    pub fn create_template(
        &mut self,
        category_id: &str,
        name: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let record = TemplateRecord::named(name);
        let template_id = self.store.document_add(
            &self.workspace,
            TEMPLATES_COLLECTION,
            record.to_fields()?,
        )?;
        let now_ms = self.documents.now_ms();

        let touched = [Touched {
            collection: TEMPLATES_COLLECTION,
            id: &template_id,
        }];
        let result = self.persist_with("create_template", &touched, |tree, document, fields| {
            let outcome = tree.attach_template(category_id, TemplateRef::new(&template_id, name));
            if outcome.is_applied() {
                let index = document.collection_index(TEMPLATES_COLLECTION)?;
                touch_index(index, &template_id, now_ms, fields)?;
            }
            Ok(outcome)
        });

        let outcome = self.settle(&template_id, None, result)?;
        Ok(with_created_id(outcome, Some(template_id)))
    }

    /// Renames the record and its reference in the tree. A template the tree
    /// does not reference is left unrenamed and reported as skipped.
    pub fn rename_template(
        &mut self,
        template_id: &str,
        name: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(existing) = self
            .store
            .document_get(&self.workspace, TEMPLATES_COLLECTION, template_id)?
        else {
            tracing::warn!(
                workspace = %self.workspace,
                template_id,
                "template not found; rename skipped"
            );
            return Ok(SyncOutcome::Skipped(SkipReason::TemplateNotFound));
        };

        let mut record = TemplateRecord::from_fields(&existing.fields)?;
        record.name = name.to_string();
        self.store.document_set(
            &self.workspace,
            TEMPLATES_COLLECTION,
            template_id,
            record.to_fields()?,
        )?;
        let now_ms = self.documents.now_ms();

        let touched = [Touched {
            collection: TEMPLATES_COLLECTION,
            id: template_id,
        }];
        let result = self.persist_with("rename_template", &touched, |tree, document, fields| {
            let outcome = tree.rename_template_ref(template_id, name);
            if outcome.is_applied() {
                let index = document.collection_index(TEMPLATES_COLLECTION)?;
                touch_index(index, template_id, now_ms, fields)?;
            }
            Ok(outcome)
        });
        self.settle(template_id, Some(existing.fields), result)
    }

    /// Deletes the record, then removes every reference to it from the tree and
    /// drops its index entry.
    pub fn delete_template(&mut self, template_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(existing) = self
            .store
            .document_get(&self.workspace, TEMPLATES_COLLECTION, template_id)?
        else {
            tracing::warn!(
                workspace = %self.workspace,
                template_id,
                "template not found; delete skipped"
            );
            return Ok(SyncOutcome::Skipped(SkipReason::TemplateNotFound));
        };

        self.store
            .document_delete(&self.workspace, TEMPLATES_COLLECTION, template_id)?;
        tracing::info!(workspace = %self.workspace, template_id, "template record deleted");

        let touched = [Touched {
            collection: TEMPLATES_COLLECTION,
            id: template_id,
        }];
        let result = self.persist_with("delete_template", &touched, |tree, document, fields| {
            // Nothing left to prune is fine: the tree is already consistent.
            tree.prune_template(template_id);
            let mut index = document.collection_index(TEMPLATES_COLLECTION)?;
            if index.remove(template_id) {
                fields.insert(TEMPLATES_COLLECTION.to_string(), index.to_value()?);
            }
            Ok(MutationOutcome::Applied)
        });
        self.settle(template_id, Some(existing.fields), result)
    }

    pub fn template(&self, template_id: &str) -> Result<Option<TemplateRecord>, SyncError> {
        let mut found = self.templates(&[template_id.to_string()])?;
        Ok(found.remove(template_id))
    }

    /// Resolves template records through the per-document cache, fetching the
    /// rest in batches.
    pub fn templates(&self, ids: &[String]) -> Result<BTreeMap<String, TemplateRecord>, SyncError> {
        let index = match self.workspace_document()? {
            Some(document) => document.collection_index(TEMPLATES_COLLECTION)?,
            None => CollectionIndex::default(),
        };
        let documents =
            self.collections
                .resolve(&self.store, &self.workspace, TEMPLATES_COLLECTION, ids, &index)?;

        let mut out = BTreeMap::new();
        for (id, fields) in documents {
            out.insert(id, TemplateRecord::from_fields(&fields)?);
        }
        Ok(out)
    }

    fn settle(
        &mut self,
        template_id: &str,
        previous: Option<FieldMap>,
        result: Result<SyncOutcome, SyncError>,
    ) -> Result<SyncOutcome, SyncError> {
        match result {
            Ok(outcome @ SyncOutcome::Persisted(_)) => Ok(outcome),
            Ok(skipped) => {
                self.compensate(template_id, previous)?;
                Ok(skipped)
            }
            Err(err) if err.committed_revision().is_some() => Err(err),
            Err(err) => {
                self.compensate(template_id, previous)?;
                Err(err)
            }
        }
    }

    /// Undoes the record step: restores `previous`, or removes the record when
    /// there was none.
    fn compensate(
        &mut self,
        template_id: &str,
        previous: Option<FieldMap>,
    ) -> Result<(), SyncError> {
        let undo = match previous {
            Some(fields) => self
                .store
                .document_set(&self.workspace, TEMPLATES_COLLECTION, template_id, fields),
            None => self
                .store
                .document_delete(&self.workspace, TEMPLATES_COLLECTION, template_id)
                .map(|_| ()),
        };
        match undo {
            Ok(()) => {
                tracing::warn!(
                    workspace = %self.workspace,
                    template_id,
                    "tree step did not land; template record restored"
                );
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    workspace = %self.workspace,
                    template_id,
                    error = %source,
                    "failed to restore template record"
                );
                Err(SyncError::Inconsistent {
                    template_id: template_id.to_string(),
                    source,
                })
            }
        }
    }
}

fn touch_index(
    mut index: CollectionIndex,
    id: &str,
    now_ms: i64,
    fields: &mut FieldMap,
) -> Result<(), SyncError> {
    index.touch(id, now_ms);
    fields.insert(TEMPLATES_COLLECTION.to_string(), index.to_value()?);
    Ok(())
}
