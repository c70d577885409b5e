#![forbid(unsafe_code)]

mod documents;
mod error;
mod tracked;
mod types;
mod workspaces;

pub use error::StoreError;
pub use tracked::TrackedStore;
pub use types::*;

use cf_core::ids::WorkspaceId;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::Path;
use std::time::Duration;

const SCHEMA_VERSION: i64 = 1;
const DB_FILE: &str = "casefile.db";

/// Upper bound on ids per `documents_in` round-trip.
pub const MAX_IN_QUERY_IDS: usize = 10;

/// What the sync layer needs from a document store.
///
/// Writes replace whole top-level fields; nested values are never merged.
pub trait DocumentStore {
    fn workspace_get(&self, workspace: &WorkspaceId)
    -> Result<Option<WorkspaceDocument>, StoreError>;

    /// Merges `fields` into the workspace document at the top level and returns
    /// the new revision. With `expected_revision` set, the write only happens
    /// if the stored revision still matches.
    fn workspace_update_fields(
        &mut self,
        workspace: &WorkspaceId,
        fields: FieldMap,
        expected_revision: Option<i64>,
    ) -> Result<i64, StoreError>;

    fn document_get(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Fetches the documents whose id is in `ids` (at most
    /// [`MAX_IN_QUERY_IDS`]). Missing ids are simply absent from the result.
    fn documents_in(
        &self,
        workspace: &WorkspaceId,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Stores a new document under a generated id and returns that id.
    fn document_add(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        fields: FieldMap,
    ) -> Result<String, StoreError>;

    /// Creates or fully replaces the document `id`.
    fn document_set(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
        fields: FieldMap,
    ) -> Result<(), StoreError>;

    /// Returns whether a document was removed.
    fn document_delete(
        &mut self,
        workspace: &WorkspaceId,
        collection: &str,
        id: &str,
    ) -> Result<bool, StoreError>;
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        install_schema(&conn)?;

        Ok(Self { conn })
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workspaces (
          workspace TEXT PRIMARY KEY,
          revision INTEGER NOT NULL,
          fields_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          workspace TEXT NOT NULL,
          collection TEXT NOT NULL,
          id TEXT NOT NULL,
          fields_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY (workspace, collection, id)
        );
        "#,
    )?;

    let stored = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    match stored {
        Some(version) if version != SCHEMA_VERSION.to_string() => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
            Ok(())
        }
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => code.code == ErrorCode::ConstraintViolation,
        _ => false,
    }
}

fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let collection = collection.trim();
    if collection.is_empty() {
        return Err(StoreError::InvalidInput("collection must not be empty"));
    }
    if collection.len() > 64
        || !collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(StoreError::InvalidInput("invalid collection name"));
    }
    Ok(())
}

fn validate_document_id(id: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() {
        return Err(StoreError::InvalidInput("document id must not be empty"));
    }
    if id.len() > 256 || id.chars().any(|c| c.is_control() || c == '/') {
        return Err(StoreError::InvalidInput("invalid document id"));
    }
    Ok(())
}

fn parse_fields(raw: &str) -> Result<FieldMap, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

fn now_ms() -> i64 {
    use cf_core::clock::{Clock, SystemClock};
    SystemClock.now_ms()
}
