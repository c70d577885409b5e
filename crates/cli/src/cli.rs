#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use cf_core::ids::WorkspaceId;
use cf_storage::{DEFAULT_GENERIC_TTL_MINUTES, DEFAULT_WORKSPACE_TTL_MINUTES, SyncConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Category tree and template catalogue of a workspace, kept in a local store.
#[derive(Debug, Parser)]
#[command(name = "casefile")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Directory holding the document store and the local cache.
    #[arg(long, env = "CASEFILE_STORAGE_DIR", default_value = ".casefile")]
    pub storage_dir: PathBuf,

    /// Workspace to operate on.
    #[arg(long, env = "CASEFILE_WORKSPACE", default_value = "default")]
    pub workspace: String,

    /// Ttl of cached template documents, in minutes.
    #[arg(long, default_value_t = DEFAULT_GENERIC_TTL_MINUTES)]
    pub generic_ttl_minutes: i64,

    /// Ttl of the cached workspace document, in minutes.
    #[arg(long, default_value_t = DEFAULT_WORKSPACE_TTL_MINUTES)]
    pub workspace_ttl_minutes: i64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub(crate) fn config(&self) -> Result<Config> {
        let workspace = WorkspaceId::try_new(self.workspace.clone())
            .with_context(|| format!("invalid workspace id {:?}", self.workspace))?;
        Ok(Config {
            storage_dir: self.storage_dir.clone(),
            workspace,
            sync: SyncConfig {
                generic_ttl_minutes: self.generic_ttl_minutes,
                workspace_ttl_minutes: self.workspace_ttl_minutes,
                ..SyncConfig::default()
            },
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub storage_dir: PathBuf,
    pub workspace: WorkspaceId,
    pub sync: SyncConfig,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create the workspace document with an empty tree.
    Init,
    /// Print the category tree.
    Tree,
    /// Add, rename or delete categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Create, rename, delete or show templates.
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Print read/write/delete counters per command.
    Usage {
        /// Reset the counters after printing them.
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum CategoryCommand {
    Add {
        name: String,
        /// Parent category id; top level when omitted.
        #[arg(long)]
        parent: Option<String>,
    },
    Rename {
        id: String,
        name: String,
    },
    /// Delete a category and everything below it.
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub(crate) enum TemplateCommand {
    Create {
        /// Category the new template is filed under.
        category_id: String,
        name: String,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
    Show {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}
