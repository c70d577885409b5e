#![forbid(unsafe_code)]

use super::{
    DocumentStore, FieldMap, SqliteStore, StoreError, StoredDocument, WorkspaceDocument,
    is_constraint_violation, now_ms, parse_fields,
};
use cf_core::ids::WorkspaceId;
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Creates an empty workspace document (`categories: []`, revision 1).
    pub fn workspace_init(
        &mut self,
        workspace: &WorkspaceId,
    ) -> Result<WorkspaceDocument, StoreError> {
        let now_ms = now_ms();
        let mut fields = FieldMap::new();
        fields.insert(
            super::CATEGORIES_FIELD.to_string(),
            serde_json::Value::Array(Vec::new()),
        );
        let fields_json = serde_json::to_string(&fields)?;

        let insert = self.conn.execute(
            "INSERT INTO workspaces(workspace, revision, fields_json, created_at_ms, updated_at_ms) \
             VALUES (?1, 1, ?2, ?3, ?3)",
            params![workspace.as_str(), fields_json, now_ms],
        );
        match insert {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(StoreError::WorkspaceAlreadyExists);
            }
            Err(err) => return Err(err.into()),
        }

        Ok(WorkspaceDocument {
            workspace: workspace.as_str().to_string(),
            revision: 1,
            fields,
            updated_at_ms: now_ms,
        })
    }

    pub fn workspace_exists(&self, workspace: &WorkspaceId) -> Result<bool, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM workspaces WHERE workspace=?1",
                params![workspace.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }
}

impl DocumentStore for SqliteStore {
    fn workspace_get(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<WorkspaceDocument>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT revision, fields_json, updated_at_ms FROM workspaces WHERE workspace=?1",
                params![workspace.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((revision, fields_json, updated_at_ms)) => Ok(Some(WorkspaceDocument {
                workspace: workspace.as_str().to_string(),
                revision,
                fields: parse_fields(&fields_json)?,
                updated_at_ms,
            })),
            None => Ok(None),
        }
    }

    fn workspace_update_fields(
        &mut self,
        workspace: &WorkspaceId,
        fields: FieldMap,
        expected_revision: Option<i64>,
    ) -> Result<i64, StoreError> {
        if fields.is_empty() {
            return Err(StoreError::InvalidInput("fields must not be empty"));
        }

        let tx = self.conn.transaction()?;
        let current = tx
            .query_row(
                "SELECT revision, fields_json FROM workspaces WHERE workspace=?1",
                params![workspace.as_str()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((revision, fields_json)) = current else {
            return Err(StoreError::UnknownWorkspace);
        };
        if let Some(expected) = expected_revision
            && expected != revision
        {
            return Err(StoreError::RevisionMismatch {
                expected,
                actual: revision,
            });
        }

        let mut merged = parse_fields(&fields_json)?;
        for (key, value) in fields {
            merged.insert(key, value);
        }
        let next_revision = revision + 1;
        tx.execute(
            "UPDATE workspaces SET revision=?2, fields_json=?3, updated_at_ms=?4 WHERE workspace=?1",
            params![
                workspace.as_str(),
                next_revision,
                serde_json::to_string(&merged)?,
                now_ms()
            ],
        )?;
        tx.commit()?;
        Ok(next_revision)
    }

    fn document_get(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.document_get_row(workspace, collection, id)
    }

    fn documents_in(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.documents_in_rows(workspace, collection, ids)
    }

    fn document_add(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        fields: FieldMap,
    ) -> Result<String, StoreError> {
        self.document_insert_row(workspace, collection, fields)
    }

    fn document_set(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
        fields: FieldMap,
    ) -> Result<(), StoreError> {
        self.document_upsert_row(workspace, collection, id, fields)
    }

    fn document_delete(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        self.document_delete_row(workspace, collection, id)
    }
}
