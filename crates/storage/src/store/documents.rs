#![forbid(unsafe_code)]

use super::{
    FieldMap, MAX_IN_QUERY_IDS, SqliteStore, StoreError, StoredDocument, is_constraint_violation,
    now_ms, parse_fields, validate_collection, validate_document_id,
};
use cf_core::ids::{WorkspaceId, new_document_id};
use rusqlite::{OptionalExtension, params, params_from_iter};

const MAX_ID_ATTEMPTS: usize = 8;

impl SqliteStore {
    pub(super) fn document_get_row(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        validate_collection(collection)?;
        validate_document_id(id)?;

        let row = self
            .conn
            .query_row(
                "SELECT fields_json, updated_at_ms FROM documents \
                 WHERE workspace=?1 AND collection=?2 AND id=?3",
                params![workspace.as_str(), collection, id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((fields_json, updated_at_ms)) => Ok(Some(StoredDocument {
                id: id.to_string(),
                fields: parse_fields(&fields_json)?,
                updated_at_ms,
            })),
            None => Ok(None),
        }
    }

    pub(super) fn documents_in_rows(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        validate_collection(collection)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_IN_QUERY_IDS {
            return Err(StoreError::InvalidInput("too many ids for one query"));
        }
        for id in ids {
            validate_document_id(id)?;
        }

        let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, fields_json, updated_at_ms FROM documents \
             WHERE workspace=?1 AND collection=?2 AND id IN ({placeholders}) \
             ORDER BY id ASC"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let bound = [workspace.as_str(), collection]
            .into_iter()
            .chain(ids.iter().map(String::as_str));
        let mut rows = stmt.query(params_from_iter(bound))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let fields_json: String = row.get(1)?;
            out.push(StoredDocument {
                id: row.get(0)?,
                fields: parse_fields(&fields_json)?,
                updated_at_ms: row.get(2)?,
            });
        }
        Ok(out)
    }

    pub(super) fn document_insert_row(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        fields: FieldMap,
    ) -> Result<String, StoreError> {
        validate_collection(collection)?;
        let fields_json = serde_json::to_string(&fields)?;
        let now_ms = now_ms();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = new_document_id();
            let insert = self.conn.execute(
                "INSERT INTO documents(workspace, collection, id, fields_json, created_at_ms, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![workspace.as_str(), collection, id, fields_json, now_ms],
            );
            match insert {
                Ok(_) => return Ok(id),
                Err(err) if is_constraint_violation(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(StoreError::DocumentAlreadyExists)
    }

    pub(super) fn document_upsert_row(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
        fields: FieldMap,
    ) -> Result<(), StoreError> {
        validate_collection(collection)?;
        validate_document_id(id)?;
        let now_ms = now_ms();

        self.conn.execute(
            r#"
            INSERT INTO documents(workspace, collection, id, fields_json, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(workspace, collection, id)
            DO UPDATE SET fields_json=excluded.fields_json, updated_at_ms=excluded.updated_at_ms
            "#,
            params![
                workspace.as_str(),
                collection,
                id,
                serde_json::to_string(&fields)?,
                now_ms
            ],
        )?;
        Ok(())
    }

    pub(super) fn document_delete_row(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        validate_collection(collection)?;
        validate_document_id(id)?;

        let deleted = self.conn.execute(
            "DELETE FROM documents WHERE workspace=?1 AND collection=?2 AND id=?3",
            params![workspace.as_str(), collection, id],
        )?;
        Ok(deleted > 0)
    }
}
