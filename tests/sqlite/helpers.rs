//! Shared helpers for `SQLite` integration tests.

use std::sync::Arc;

use camino::Utf8PathBuf;
use eyre::{OptionExt, WrapErr};
use mockable::DefaultClock;
use storyloom::storage::{build_pool, establish, try_initialize_application_database};
use storyloom::story::adapters::sqlite::SqliteStoryRepository;
use storyloom::story::services::StoryWorkflowService;
use tempfile::TempDir;

/// Workflow service type used by the `SQLite` tests.
pub type SqliteService = StoryWorkflowService<SqliteStoryRepository, DefaultClock>;

/// A database file in a temporary directory.
///
/// The directory, and with it the database, is removed on drop.
pub struct TestDatabase {
    _dir: TempDir,
    url: String,
}

impl TestDatabase {
    /// Creates an empty database file without a schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn empty() -> eyre::Result<Self> {
        let dir = tempfile::tempdir().wrap_err("create temporary directory")?;
        let path = Utf8PathBuf::from_path_buf(dir.path().join("stories.db"))
            .ok()
            .ok_or_eyre("temporary path is not UTF-8")?;
        Ok(Self {
            url: path.into_string(),
            _dir: dir,
        })
    }

    /// Creates a database file and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn initialized() -> eyre::Result<Self> {
        let database = Self::empty()?;
        let mut connection = establish(database.url())?;
        try_initialize_application_database(&mut connection, true)
            .wrap_err("initialize test schema")?;
        Ok(database)
    }

    /// Returns the database path.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Builds a pooled repository over the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built.
    pub fn repository(&self) -> eyre::Result<SqliteStoryRepository> {
        let pool = build_pool(self.url(), 4).wrap_err("build connection pool")?;
        Ok(SqliteStoryRepository::new(pool))
    }

    /// Builds a workflow service over a fresh repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built.
    pub fn service(&self) -> eyre::Result<SqliteService> {
        Ok(StoryWorkflowService::new(
            Arc::new(self.repository()?),
            Arc::new(DefaultClock),
        ))
    }
}
