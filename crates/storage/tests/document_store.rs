#![forbid(unsafe_code)]

use cf_core::ids::WorkspaceId;
use cf_storage::{DocumentStore, FieldMap, SqliteStore, StoreError, TemplateRecord};
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("cf_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn fields(value: serde_json::Value) -> FieldMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn workspace_init_creates_empty_tree_once() {
    let mut store = SqliteStore::open(temp_dir("workspace_init")).expect("open store");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");

    assert!(store.workspace_get(&workspace).expect("get").is_none());
    let doc = store.workspace_init(&workspace).expect("init");
    assert_eq!(doc.revision, 1);
    assert!(doc.categories().expect("categories").is_empty());
    assert!(store.workspace_exists(&workspace).expect("exists"));

    assert!(matches!(
        store.workspace_init(&workspace),
        Err(StoreError::WorkspaceAlreadyExists)
    ));
}

#[test]
fn update_fields_replaces_top_level_values_without_deep_merge() {
    let mut store = SqliteStore::open(temp_dir("update_fields")).expect("open store");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");
    store.workspace_init(&workspace).expect("init");

    store
        .workspace_update_fields(
            &workspace,
            fields(json!({"settings": {"locale": "nl", "theme": "dark"}, "title": "Acme"})),
            None,
        )
        .expect("first write");
    let revision = store
        .workspace_update_fields(&workspace, fields(json!({"settings": {"locale": "en"}})), None)
        .expect("second write");
    assert_eq!(revision, 3);

    let doc = store.workspace_get(&workspace).expect("get").expect("doc");
    assert_eq!(doc.field("settings"), Some(&json!({"locale": "en"})));
    assert_eq!(doc.field("title"), Some(&json!("Acme")));
    assert_eq!(doc.field("categories"), Some(&json!([])));
}

#[test]
fn update_fields_checks_expected_revision() {
    let mut store = SqliteStore::open(temp_dir("expected_revision")).expect("open store");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");
    store.workspace_init(&workspace).expect("init");

    let revision = store
        .workspace_update_fields(&workspace, fields(json!({"a": 1})), Some(1))
        .expect("matching revision");
    assert_eq!(revision, 2);

    let err = store
        .workspace_update_fields(&workspace, fields(json!({"a": 2})), Some(1))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::RevisionMismatch {
            expected: 1,
            actual: 2
        }
    ));
    let doc = store.workspace_get(&workspace).expect("get").expect("doc");
    assert_eq!(doc.field("a"), Some(&json!(1)));
}

#[test]
fn update_fields_on_unknown_workspace_fails() {
    let mut store = SqliteStore::open(temp_dir("unknown_workspace")).expect("open store");
    let workspace = WorkspaceId::try_new("ghost").expect("workspace id");
    let err = store
        .workspace_update_fields(&workspace, fields(json!({"a": 1})), None)
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownWorkspace));
}

#[test]
fn documents_round_trip_within_their_collection() {
    let mut store = SqliteStore::open(temp_dir("documents")).expect("open store");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");

    let record = TemplateRecord {
        content: "Dear {{name}}".to_string(),
        name: "Letter".to_string(),
        variables: vec!["name".to_string()],
    };
    let id = store
        .document_add(&workspace, "templates", record.to_fields().expect("fields"))
        .expect("add");
    assert_eq!(id.len(), 20);

    let stored = store
        .document_get(&workspace, "templates", &id)
        .expect("get")
        .expect("present");
    assert_eq!(TemplateRecord::from_fields(&stored.fields).expect("decode"), record);
    assert!(
        store
            .document_get(&workspace, "contacts", &id)
            .expect("get")
            .is_none()
    );

    store
        .document_set(&workspace, "templates", &id, fields(json!({"name": "Renamed"})))
        .expect("set");
    let stored = store
        .document_get(&workspace, "templates", &id)
        .expect("get")
        .expect("present");
    assert_eq!(stored.fields, fields(json!({"name": "Renamed"})));

    assert!(store.document_delete(&workspace, "templates", &id).expect("delete"));
    assert!(!store.document_delete(&workspace, "templates", &id).expect("delete again"));
}

#[test]
fn documents_in_is_capped_and_skips_missing_ids() {
    let mut store = SqliteStore::open(temp_dir("documents_in")).expect("open store");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");

    let mut ids = Vec::new();
    for n in 0..3 {
        let id = format!("doc-{n}");
        store
            .document_set(&workspace, "templates", &id, fields(json!({"name": n})))
            .expect("set");
        ids.push(id);
    }
    ids.push("doc-missing".to_string());

    let found = store
        .documents_in(&workspace, "templates", &ids)
        .expect("query");
    let found_ids: Vec<&str> = found.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(found_ids, vec!["doc-0", "doc-1", "doc-2"]);

    let too_many: Vec<String> = (0..11).map(|n| format!("x{n}")).collect();
    assert!(matches!(
        store.documents_in(&workspace, "templates", &too_many),
        Err(StoreError::InvalidInput(_))
    ));
    assert!(
        store
            .documents_in(&workspace, "templates", &[])
            .expect("empty")
            .is_empty()
    );
}

#[test]
fn invalid_collection_and_ids_are_rejected() {
    let mut store = SqliteStore::open(temp_dir("invalid_input")).expect("open store");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");

    assert!(matches!(
        store.document_get(&workspace, "", "a"),
        Err(StoreError::InvalidInput(_))
    ));
    assert!(matches!(
        store.document_set(&workspace, "templates", "a/b", FieldMap::new()),
        Err(StoreError::InvalidInput(_))
    ));
}

#[test]
fn data_survives_reopen() {
    let dir = temp_dir("reopen");
    let workspace = WorkspaceId::try_new("acme").expect("workspace id");
    {
        let mut store = SqliteStore::open(&dir).expect("open store");
        store.workspace_init(&workspace).expect("init");
        let categories = fields(json!({"categories": [{"id": "a", "name": "A"}]}));
        store
            .workspace_update_fields(&workspace, categories, None)
            .expect("write");
    }
    let store = SqliteStore::open(&dir).expect("reopen store");
    let doc = store.workspace_get(&workspace).expect("get").expect("doc");
    assert_eq!(doc.revision, 2);
    assert_eq!(doc.categories().expect("categories").category_ids(), vec!["a"]);
}
