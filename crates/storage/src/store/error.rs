#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("revision mismatch (expected={expected}, actual={actual})")]
    RevisionMismatch { expected: i64, actual: i64 },
    #[error("unknown workspace")]
    UnknownWorkspace,
    #[error("workspace already exists")]
    WorkspaceAlreadyExists,
    #[error("document already exists")]
    DocumentAlreadyExists,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
