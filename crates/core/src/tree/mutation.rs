#![forbid(unsafe_code)]

use super::walk::{edit_first, for_each_mut};
use super::{Category, CategoryTree, TemplateRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The target id was not found; the tree is unchanged.
    NotFound,
    /// Insert rejected because the new category id is already in the tree.
    DuplicateId,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NotFound => "not_found",
            Self::DuplicateId => "duplicate_id",
        }
    }

    fn found(found: Option<()>) -> Self {
        match found {
            Some(()) => Self::Applied,
            None => Self::NotFound,
        }
    }
}

impl CategoryTree {
    /// Appends `category` to the roots (`parent_id == None`) or to the `sub`
    /// list of the first category whose id is `parent_id`.
    pub fn insert_category(
        &mut self,
        parent_id: Option<&str>,
        category: Category,
    ) -> MutationOutcome {
        let incoming = std::iter::once(&category).chain(category.descendants());
        for node in incoming {
            if self.contains_category(&node.id) {
                return MutationOutcome::DuplicateId;
            }
        }

        let Some(parent_id) = parent_id else {
            self.roots.push(category);
            return MutationOutcome::Applied;
        };

        MutationOutcome::found(edit_first(
            &mut self.roots,
            |node| node.id == parent_id,
            |siblings, index| siblings[index].sub.push(category),
        ))
    }

    /// Removes the first category with `category_id` together with its whole
    /// subtree. Template records referenced from the subtree are not touched.
    pub fn remove_category(&mut self, category_id: &str) -> MutationOutcome {
        MutationOutcome::found(edit_first(
            &mut self.roots,
            |node| node.id == category_id,
            |siblings, index| {
                siblings.remove(index);
            },
        ))
    }

    pub fn rename_category(&mut self, category_id: &str, name: &str) -> MutationOutcome {
        MutationOutcome::found(edit_first(
            &mut self.roots,
            |node| node.id == category_id,
            |siblings, index| siblings[index].name = name.to_string(),
        ))
    }

    pub fn attach_template(&mut self, category_id: &str, template: TemplateRef) -> MutationOutcome {
        MutationOutcome::found(edit_first(
            &mut self.roots,
            |node| node.id == category_id,
            |siblings, index| siblings[index].templates.push(template),
        ))
    }

    /// Removes the first reference to `template_id`; later references stay.
    pub fn detach_template(&mut self, template_id: &str) -> MutationOutcome {
        MutationOutcome::found(edit_first(
            &mut self.roots,
            |node| holds_template(node, template_id),
            |siblings, index| {
                let templates = &mut siblings[index].templates;
                if let Some(pos) = templates.iter().position(|t| t.id == template_id) {
                    templates.remove(pos);
                }
            },
        ))
    }

    pub fn rename_template_ref(&mut self, template_id: &str, name: &str) -> MutationOutcome {
        MutationOutcome::found(edit_first(
            &mut self.roots,
            |node| holds_template(node, template_id),
            |siblings, index| {
                if let Some(template) = siblings[index]
                    .templates
                    .iter_mut()
                    .find(|t| t.id == template_id)
                {
                    template.name = name.to_string();
                }
            },
        ))
    }

    /// Removes every reference to `template_id` anywhere in the forest.
    pub fn prune_template(&mut self, template_id: &str) -> MutationOutcome {
        let mut removed = 0usize;
        for_each_mut(&mut self.roots, &mut |category: &mut Category| {
            let before = category.templates.len();
            category.templates.retain(|t| t.id != template_id);
            removed += before - category.templates.len();
        });
        if removed > 0 {
            MutationOutcome::Applied
        } else {
            MutationOutcome::NotFound
        }
    }
}

fn holds_template(category: &Category, template_id: &str) -> bool {
    category.templates.iter().any(|t| t.id == template_id)
}

/// A tree edit described as data, so callers can hand it to the sync layer or
/// apply it to a snapshot without touching the original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeMutation {
    InsertCategory {
        parent_id: Option<String>,
        category: Category,
    },
    RemoveCategory {
        category_id: String,
    },
    RenameCategory {
        category_id: String,
        name: String,
    },
    AttachTemplate {
        category_id: String,
        template: TemplateRef,
    },
    DetachTemplate {
        template_id: String,
    },
    RenameTemplateRef {
        template_id: String,
        name: String,
    },
    PruneTemplate {
        template_id: String,
    },
}

impl TreeMutation {
    pub fn apply(&self, tree: &mut CategoryTree) -> MutationOutcome {
        match self {
            Self::InsertCategory {
                parent_id,
                category,
            } => tree.insert_category(parent_id.as_deref(), category.clone()),
            Self::RemoveCategory { category_id } => tree.remove_category(category_id),
            Self::RenameCategory { category_id, name } => tree.rename_category(category_id, name),
            Self::AttachTemplate {
                category_id,
                template,
            } => tree.attach_template(category_id, template.clone()),
            Self::DetachTemplate { template_id } => tree.detach_template(template_id),
            Self::RenameTemplateRef { template_id, name } => {
                tree.rename_template_ref(template_id, name)
            }
            Self::PruneTemplate { template_id } => tree.prune_template(template_id),
        }
    }

    /// Pure form of [`TreeMutation::apply`]: `tree` is left as it was.
    pub fn applied_to(&self, tree: &CategoryTree) -> (CategoryTree, MutationOutcome) {
        let mut next = tree.clone();
        let outcome = self.apply(&mut next);
        (next, outcome)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsertCategory { .. } => "insert_category",
            Self::RemoveCategory { .. } => "remove_category",
            Self::RenameCategory { .. } => "rename_category",
            Self::AttachTemplate { .. } => "attach_template",
            Self::DetachTemplate { .. } => "detach_template",
            Self::RenameTemplateRef { .. } => "rename_template_ref",
            Self::PruneTemplate { .. } => "prune_template",
        }
    }
}
