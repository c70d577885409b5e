use super::*;

fn sample() -> CategoryTree {
    CategoryTree::from_roots(vec![
        Category::new("legal", "Legal")
            .with_sub(
                Category::new("nda", "NDA").with_template(TemplateRef::new("t-nda", "Mutual NDA")),
            )
            .with_sub(Category::new("lease", "Lease")),
        Category::new("sales", "Sales").with_template(TemplateRef::new("t-quote", "Quote")),
    ])
}

#[test]
fn insert_at_root_and_under_nested_parent() {
    let mut tree = sample();

    assert_eq!(
        tree.insert_category(None, Category::new("hr", "HR")),
        MutationOutcome::Applied
    );
    assert_eq!(tree.roots().last().unwrap().id, "hr");

    assert_eq!(
        tree.insert_category(Some("nda"), Category::new("nda-eu", "EU")),
        MutationOutcome::Applied
    );
    let nda = tree.find("nda").unwrap();
    assert_eq!(nda.sub.len(), 1);
    assert_eq!(nda.sub[0].id, "nda-eu");
}

#[test]
fn insert_under_missing_parent_is_reported_and_leaves_tree_alone() {
    let mut tree = sample();
    let before = tree.clone();
    assert_eq!(
        tree.insert_category(Some("nope"), Category::new("x", "X")),
        MutationOutcome::NotFound
    );
    assert_eq!(tree, before);
}

#[test]
fn insert_rejects_ids_already_in_tree() {
    let mut tree = sample();
    let before = tree.clone();
    assert_eq!(
        tree.insert_category(None, Category::new("lease", "Another lease")),
        MutationOutcome::DuplicateId
    );
    assert_eq!(
        tree.insert_category(
            Some("sales"),
            Category::new("fresh", "Fresh").with_sub(Category::new("legal", "Clash"))
        ),
        MutationOutcome::DuplicateId
    );
    assert_eq!(tree, before);
}

#[test]
fn insert_then_remove_leaves_no_trace_of_id() {
    let mut tree = sample();
    for parent in [None, Some("legal"), Some("lease")] {
        tree.insert_category(parent, Category::new("tmp", "Temp"));
        assert!(tree.contains_category("tmp"));
        assert_eq!(tree.remove_category("tmp"), MutationOutcome::Applied);
        assert!(!tree.contains_category("tmp"));
    }
    assert_eq!(tree, sample());
}

#[test]
fn remove_drops_whole_subtree_and_its_references() {
    let mut tree = sample();
    assert_eq!(tree.remove_category("legal"), MutationOutcome::Applied);
    assert_eq!(tree.category_ids(), vec!["sales"]);
    assert!(!tree.references_template("t-nda"));
    assert_eq!(tree.remove_category("legal"), MutationOutcome::NotFound);
}

#[test]
fn rename_missing_category_is_a_reported_no_op() {
    let mut tree = sample();
    assert_eq!(tree.rename_category("ghost", "Boo"), MutationOutcome::NotFound);
    assert_eq!(tree, sample());

    assert_eq!(tree.rename_category("lease", "Leases"), MutationOutcome::Applied);
    assert_eq!(tree.find("lease").unwrap().name, "Leases");
}

#[test]
fn traversal_is_preorder_parent_before_children() {
    let tree = sample();
    assert_eq!(tree.category_ids(), vec!["legal", "nda", "lease", "sales"]);
    let refs: Vec<&str> = tree.template_refs().into_iter().map(|t| t.id.as_str()).collect();
    assert_eq!(refs, vec!["t-nda", "t-quote"]);
}

/// Two nodes share `dup`: the nested one under `a` comes first in preorder,
/// ahead of the later root.
fn malformed() -> CategoryTree {
    CategoryTree::from_roots(vec![
        Category::new("a", "A").with_sub(
            Category::new("dup", "first").with_template(TemplateRef::new("t1", "one")),
        ),
        Category::new("dup", "second").with_template(TemplateRef::new("t1", "one again")),
    ])
}

#[test]
fn duplicate_ids_are_detected() {
    assert_eq!(malformed().duplicate_category_ids(), vec!["dup".to_string()]);
    assert!(sample().duplicate_category_ids().is_empty());
}

#[test]
fn all_mutators_hit_the_earlier_of_duplicate_ids() {
    let mut tree = malformed();
    tree.rename_category("dup", "renamed");
    assert_eq!(tree.roots()[0].sub[0].name, "renamed");
    assert_eq!(tree.roots()[1].name, "second");

    let mut tree = malformed();
    tree.attach_template("dup", TemplateRef::new("t2", "two"));
    assert_eq!(tree.roots()[0].sub[0].templates.len(), 2);
    assert_eq!(tree.roots()[1].templates.len(), 1);

    let mut tree = malformed();
    tree.remove_category("dup");
    assert!(tree.roots()[0].sub.is_empty());
    assert_eq!(tree.roots()[1].id, "dup");

    let mut tree = malformed();
    tree.detach_template("t1");
    assert!(tree.roots()[0].sub[0].templates.is_empty());
    assert_eq!(tree.roots()[1].templates.len(), 1);

    let mut tree = malformed();
    tree.rename_template_ref("t1", "uno");
    assert_eq!(tree.roots()[0].sub[0].templates[0].name, "uno");
    assert_eq!(tree.roots()[1].templates[0].name, "one again");
}

#[test]
fn insert_under_duplicate_parent_lands_under_the_earlier_one() {
    let mut tree = malformed();
    assert_eq!(
        tree.insert_category(Some("dup"), Category::new("child", "Child")),
        MutationOutcome::Applied
    );
    assert_eq!(tree.roots()[0].sub[0].sub[0].id, "child");
    assert!(tree.roots()[1].sub.is_empty());
}

#[test]
fn ancestor_wins_over_descendant_with_same_id() {
    let nested = || {
        CategoryTree::from_roots(vec![
            Category::new("dup", "outer")
                .with_sub(
                    Category::new("dup", "inner").with_template(TemplateRef::new("t1", "one")),
                )
                .with_template(TemplateRef::new("t1", "outer one")),
        ])
    };

    let mut tree = nested();
    tree.rename_category("dup", "renamed");
    assert_eq!(tree.roots()[0].name, "renamed");
    assert_eq!(tree.roots()[0].sub[0].name, "inner");

    let mut tree = nested();
    tree.attach_template("dup", TemplateRef::new("t2", "two"));
    assert_eq!(tree.roots()[0].templates.len(), 2);
    assert_eq!(tree.roots()[0].sub[0].templates.len(), 1);

    let mut tree = nested();
    tree.insert_category(Some("dup"), Category::new("child", "Child"));
    assert_eq!(tree.roots()[0].sub.len(), 2);
    assert!(tree.roots()[0].sub[0].sub.is_empty());

    let mut tree = nested();
    tree.detach_template("t1");
    assert!(tree.roots()[0].templates.is_empty());
    assert_eq!(tree.roots()[0].sub[0].templates.len(), 1);

    let mut tree = nested();
    tree.rename_template_ref("t1", "uno");
    assert_eq!(tree.roots()[0].templates[0].name, "uno");
    assert_eq!(tree.roots()[0].sub[0].templates[0].name, "one");

    let mut tree = nested();
    assert_eq!(tree.remove_category("dup"), MutationOutcome::Applied);
    assert!(tree.is_empty());
}

#[test]
fn siblings_are_searched_in_order_before_deeper_cousins() {
    // `b` at the root is found only after the subtree of `a` is exhausted.
    let mut tree = CategoryTree::from_roots(vec![
        Category::new("a", "A").with_sub(Category::new("b", "nested b")),
        Category::new("b", "root b"),
    ]);
    tree.rename_category("b", "hit");
    assert_eq!(tree.roots()[0].sub[0].name, "hit");
    assert_eq!(tree.roots()[1].name, "root b");
}

#[test]
fn prune_removes_every_reference() {
    let mut tree = malformed();
    assert_eq!(tree.prune_template("t1"), MutationOutcome::Applied);
    assert!(!tree.references_template("t1"));
    assert_eq!(tree.prune_template("t1"), MutationOutcome::NotFound);
}

#[test]
fn detach_and_rename_of_unknown_template_are_not_found() {
    let mut tree = sample();
    assert_eq!(tree.detach_template("t-x"), MutationOutcome::NotFound);
    assert_eq!(tree.rename_template_ref("t-x", "X"), MutationOutcome::NotFound);
    assert_eq!(tree, sample());
}

#[test]
fn applied_to_leaves_input_untouched() {
    let tree = sample();
    let mutation = TreeMutation::RenameCategory {
        category_id: "sales".to_string(),
        name: "Revenue".to_string(),
    };
    let (next, outcome) = mutation.applied_to(&tree);
    assert_eq!(outcome, MutationOutcome::Applied);
    assert_eq!(tree, sample());
    assert_eq!(next.find("sales").unwrap().name, "Revenue");
}

#[test]
fn contracts_invoice_walkthrough() {
    let mut tree = sample();
    let roots_before = tree.roots().len();

    let contracts = Category::new(tree.unique_category_id(), "Contracts");
    let contracts_id = contracts.id.clone();
    assert!(tree.insert_category(None, contracts).is_applied());
    assert_eq!(tree.roots().len(), roots_before + 1);
    let added = tree.roots().last().unwrap();
    assert_eq!(added.name, "Contracts");
    assert!(added.sub.is_empty() && added.templates.is_empty());

    let invoice = TemplateRef::new("t1", "Invoice");
    assert!(tree.attach_template(&contracts_id, invoice.clone()).is_applied());
    assert_eq!(tree.find(&contracts_id).unwrap().templates, vec![invoice]);

    assert!(tree.remove_category(&contracts_id).is_applied());
    assert!(!tree.contains_category(&contracts_id));
    assert!(!tree.references_template("t1"));
}

#[test]
fn json_shape_matches_workspace_document() {
    let raw = r#"[{"id":"a","name":"A","sub":[{"id":"b","name":"B"}],"templates":[{"id":"t","name":"T"}]}]"#;
    let tree: CategoryTree = serde_json::from_str(raw).unwrap();
    assert_eq!(tree.category_ids(), vec!["a", "b"]);
    assert!(tree.find("b").unwrap().templates.is_empty());

    let out = serde_json::to_value(&tree).unwrap();
    assert_eq!(out[0]["sub"][0]["sub"], serde_json::json!([]));
    assert_eq!(out[0]["templates"][0]["name"], "T");
}
