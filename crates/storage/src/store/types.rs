#![forbid(unsafe_code)]

use cf_core::tree::CategoryTree;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level fields of a stored document.
pub type FieldMap = Map<String, Value>;

pub const CATEGORIES_FIELD: &str = "categories";
pub const TEMPLATES_COLLECTION: &str = "templates";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub workspace: String,
    pub revision: i64,
    pub fields: FieldMap,
    pub updated_at_ms: i64,
}

impl WorkspaceDocument {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The `categories` tree; an absent or null field reads as an empty tree.
    pub fn categories(&self) -> Result<CategoryTree, serde_json::Error> {
        match self.fields.get(CATEGORIES_FIELD) {
            None | Some(Value::Null) => Ok(CategoryTree::new()),
            Some(value) => CategoryTree::deserialize(value),
        }
    }

    /// The auxiliary `document-id -> {lastUpdated}` map stored under the
    /// collection's name.
    pub fn collection_index(&self, collection: &str) -> Result<CollectionIndex, serde_json::Error> {
        match self.fields.get(collection) {
            None | Some(Value::Null) => Ok(CollectionIndex::default()),
            Some(value) => CollectionIndex::deserialize(value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "lastUpdated")]
    pub last_updated_ms: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl CollectionIndex {
    pub fn get(&self, id: &str) -> Option<IndexEntry> {
        self.entries.get(id).copied()
    }

    pub fn touch(&mut self, id: impl Into<String>, now_ms: i64) {
        self.entries.insert(
            id.into(),
            IndexEntry {
                last_updated_ms: now_ms,
            },
        );
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a copy fetched at `fetched_at_ms` still reflects the latest
    /// known update. Ids the index does not track are taken as unchanged.
    pub fn is_fresh(&self, id: &str, fetched_at_ms: i64) -> bool {
        match self.entries.get(id) {
            Some(entry) => fetched_at_ms > entry.last_updated_ms,
            None => true,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: FieldMap,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(default)]
    pub content: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<String>,
}

impl TemplateRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_fields(fields: &FieldMap) -> Result<Self, serde_json::Error> {
        Self::deserialize(Value::Object(fields.clone()))
    }

    pub fn to_fields(&self) -> Result<FieldMap, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(FieldMap::new()),
        }
    }
}
