//! Application state management.

use sear_core::{Config, SearchDatabase};
use std::path::PathBuf;
use tracing::info;

/// Shared application state: the configuration and an opened database.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The search database
    pub db: SearchDatabase,

    /// Where the database is persisted
    pub path: PathBuf,
}

impl App {
    /// Open the database at the configured path, or start empty when no
    /// file exists yet.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let path = config.database_path.clone();
        let db = SearchDatabase::with_options(config.indexing.to_options());
        if path.exists() {
            db.load_from_path(&path)?;
        } else {
            info!(path = %path.display(), "no database file yet, starting empty");
        }
        Ok(App { config, db, path })
    }

    /// Persist the database, creating the parent directory when needed.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.db.save_to_path(&self.path)?;
        Ok(())
    }
}
