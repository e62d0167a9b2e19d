//! Workspace discovery and project configuration.
//!
//! A snag workspace is any directory holding a `.snag/` directory; commands
//! find it by walking up from the current directory, so they work from any
//! subdirectory of the property office's tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snag_core::store::SqliteStore;
use tracing::debug;

/// Name of the workspace marker directory.
pub const SNAG_DIR: &str = ".snag";

const CONFIG_FILE: &str = "config.toml";

/// Project-level configuration, stored at `.snag/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file name, relative to the `.snag` directory.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
        }
    }
}

fn default_db_file() -> String {
    "snag.sqlite3".to_string()
}

/// An opened snag workspace.
#[derive(Debug)]
pub struct Workspace {
    pub snag_dir: PathBuf,
    pub config: ProjectConfig,
}

impl Workspace {
    /// Discover the workspace by walking up from `start`.
    ///
    /// # Errors
    ///
    /// Fails when no `.snag` directory exists on the path to the filesystem
    /// root, or when the config file is unreadable.
    pub fn discover(start: &Path) -> Result<Self> {
        let snag_dir = find_snag_dir(start).with_context(|| {
            format!(
                "no {SNAG_DIR} workspace found from {} (run `snag init` first)",
                start.display()
            )
        })?;
        debug!(snag_dir = %snag_dir.display(), "discovered workspace");
        let config = load_config(&snag_dir)?;
        Ok(Self { snag_dir, config })
    }

    /// Create the workspace at `root`, writing a default config when none
    /// exists, and run store migrations.
    ///
    /// # Errors
    ///
    /// Fails when the directory or config cannot be written, or the store
    /// cannot be opened.
    pub fn init(root: &Path) -> Result<Self> {
        let snag_dir = root.join(SNAG_DIR);
        std::fs::create_dir_all(&snag_dir)
            .with_context(|| format!("create {}", snag_dir.display()))?;

        let config_path = snag_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            let rendered =
                toml::to_string_pretty(&ProjectConfig::default()).context("render config")?;
            std::fs::write(&config_path, rendered)
                .with_context(|| format!("write {}", config_path.display()))?;
        }

        let workspace = Self {
            snag_dir,
            config: load_config_at(&config_path)?,
        };
        workspace.open_store()?;
        Ok(workspace)
    }

    /// Open the workspace's SQLite store.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or migrated.
    pub fn open_store(&self) -> Result<SqliteStore> {
        let path = self.snag_dir.join(&self.config.store.db_file);
        debug!(db = %path.display(), "opening store");
        SqliteStore::open(&path).with_context(|| format!("open store {}", path.display()))
    }
}

/// Find the `.snag` directory by walking up from `start`.
fn find_snag_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(SNAG_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn load_config(snag_dir: &Path) -> Result<ProjectConfig> {
    load_config_at(&snag_dir.join(CONFIG_FILE))
}

fn load_config_at(path: &Path) -> Result<ProjectConfig> {
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
