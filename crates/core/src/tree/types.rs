#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `{id, name}` pointer from the tree to a template record stored elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub id: String,
    pub name: String,
}

impl TemplateRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sub: Vec<Category>,
    #[serde(default)]
    pub templates: Vec<TemplateRef>,
}

impl Category {
    /// Empty category with no children and no templates.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sub: Vec::new(),
            templates: Vec::new(),
        }
    }

    pub fn with_sub(mut self, child: Category) -> Self {
        self.sub.push(child);
        self
    }

    pub fn with_template(mut self, template: TemplateRef) -> Self {
        self.templates.push(template);
        self
    }

    /// Preorder iterator over this category's descendants (not itself).
    pub fn descendants(&self) -> Preorder<'_> {
        Preorder {
            stack: self.sub.iter().rev().collect(),
        }
    }
}

/// The `categories` field of a workspace document: an ordered root forest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTree {
    pub(super) roots: Vec<Category>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: Vec<Category>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[Category] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Preorder iterator over every category in the forest.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder {
            stack: self.roots.iter().rev().collect(),
        }
    }

    pub fn find(&self, category_id: &str) -> Option<&Category> {
        self.iter().find(|category| category.id == category_id)
    }

    pub fn contains_category(&self, category_id: &str) -> bool {
        self.find(category_id).is_some()
    }

    pub fn category_ids(&self) -> Vec<&str> {
        self.iter().map(|category| category.id.as_str()).collect()
    }

    pub fn template_refs(&self) -> Vec<&TemplateRef> {
        self.iter()
            .flat_map(|category| category.templates.iter())
            .collect()
    }

    pub fn references_template(&self, template_id: &str) -> bool {
        self.iter()
            .any(|category| category.templates.iter().any(|t| t.id == template_id))
    }

    /// Ids that occur on more than one node, in first-seen order.
    pub fn duplicate_category_ids(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        let mut out = Vec::new();
        for category in self.iter() {
            if !seen.insert(category.id.as_str()) && reported.insert(category.id.as_str()) {
                out.push(category.id.clone());
            }
        }
        out
    }

    /// Draws short ids until one is not already used in this tree.
    pub fn unique_category_id(&self) -> String {
        loop {
            let candidate = crate::ids::new_category_id();
            if !self.contains_category(&candidate) {
                return candidate;
            }
        }
    }
}

pub struct Preorder<'a> {
    stack: Vec<&'a Category>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Category;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.sub.iter().rev());
        Some(next)
    }
}
