#![forbid(unsafe_code)]

use crate::cli::{CategoryCommand, Command, Config, TemplateCommand};
use anyhow::{Context, Result};
use cf_core::clock::SystemClock;
use cf_storage::cache::SqliteKv;
use cf_storage::{
    SqliteStore, StoreError, SyncOutcome, TrackedStore, UsageTracker, WorkspaceSync,
};
use serde_json::{Value, json};
use std::rc::Rc;

type Store = TrackedStore<SqliteStore, Rc<SqliteKv>>;
type Session = WorkspaceSync<Store, Rc<SqliteKv>, SystemClock>;

/// Usage snapshots list these scopes first.
const SCOPE_ORDER: [&str; 4] = ["init", "tree", "category", "template"];

pub(crate) fn execute(command: Command, config: &Config) -> Result<Value> {
    let kv = Rc::new(SqliteKv::open(&config.storage_dir).with_context(|| {
        format!("open local cache in {}", config.storage_dir.display())
    })?);

    match command {
        Command::Init => init(config, kv),
        Command::Tree => {
            let sync = open_sync(config, kv, "tree")?;
            let Some(tree) = sync.categories()? else {
                anyhow::bail!("workspace {} is not initialized", config.workspace);
            };
            Ok(json!({
                "workspace": config.workspace.as_str(),
                "categories": serde_json::to_value(&tree)?,
            }))
        }
        Command::Category(action) => category(open_sync(config, kv, "category")?, action),
        Command::Template(action) => template(open_sync(config, kv, "template")?, action),
        Command::Usage { clear } => usage(kv, clear),
    }
}

fn tracker(kv: Rc<SqliteKv>) -> UsageTracker<Rc<SqliteKv>> {
    UsageTracker::with_order(kv, SCOPE_ORDER)
}

fn open_store(config: &Config, kv: &Rc<SqliteKv>, scope: &str) -> Result<Store> {
    let store = SqliteStore::open(&config.storage_dir).with_context(|| {
        format!("open store in {}", config.storage_dir.display())
    })?;
    Ok(TrackedStore::new(store, tracker(Rc::clone(kv)), scope))
}

fn open_sync(config: &Config, kv: Rc<SqliteKv>, scope: &str) -> Result<Session> {
    let store = open_store(config, &kv, scope)?;
    Ok(WorkspaceSync::with_config(
        store,
        config.workspace.clone(),
        kv,
        SystemClock,
        &config.sync,
    ))
}

fn init(config: &Config, kv: Rc<SqliteKv>) -> Result<Value> {
    let mut store = open_store(config, &kv, "init")?;
    let created = match store.inner_mut().workspace_init(&config.workspace) {
        Ok(document) => {
            tracing::info!(
                workspace = %config.workspace,
                revision = document.revision,
                "workspace initialized"
            );
            true
        }
        Err(StoreError::WorkspaceAlreadyExists) => false,
        Err(err) => return Err(err.into()),
    };
    if created && let Err(err) = store.usage().track_write("init", 1) {
        tracing::warn!(error = %err, "failed to record usage");
    }
    Ok(json!({
        "workspace": config.workspace.as_str(),
        "created": created,
    }))
}

fn category(mut sync: Session, action: CategoryCommand) -> Result<Value> {
    let outcome = match action {
        CategoryCommand::Add { name, parent } => sync.create_category(parent.as_deref(), &name)?,
        CategoryCommand::Rename { id, name } => sync.rename_category(&id, &name)?,
        CategoryCommand::Delete { id } => sync.delete_category(&id)?,
    };
    outcome_json(&outcome)
}

fn template(mut sync: Session, action: TemplateCommand) -> Result<Value> {
    let outcome = match action {
        TemplateCommand::Create { category_id, name } => {
            sync.create_template(&category_id, &name)?
        }
        TemplateCommand::Rename { id, name } => sync.rename_template(&id, &name)?,
        TemplateCommand::Delete { id } => sync.delete_template(&id)?,
        TemplateCommand::Show { ids } => {
            let found = sync.templates(&ids)?;
            let missing: Vec<&String> = ids.iter().filter(|id| !found.contains_key(*id)).collect();
            return Ok(json!({
                "templates": serde_json::to_value(&found)?,
                "missing": missing,
            }));
        }
    };
    outcome_json(&outcome)
}

fn usage(kv: Rc<SqliteKv>, clear: bool) -> Result<Value> {
    let tracker = tracker(kv);
    let snapshot = tracker.snapshot()?;
    if clear {
        tracker.clear()?;
    }
    Ok(serde_json::to_value(snapshot)?)
}

fn outcome_json(outcome: &SyncOutcome) -> Result<Value> {
    Ok(match outcome {
        SyncOutcome::Persisted(persisted) => json!({
            "status": "persisted",
            "revision": persisted.revision,
            "created_id": persisted.created_id,
            "categories": serde_json::to_value(&persisted.tree)?,
        }),
        SyncOutcome::Skipped(reason) => json!({
            "status": "skipped",
            "reason": reason.as_str(),
        }),
    })
}
