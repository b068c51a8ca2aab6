//! Process start-up: foreign keys, transactional schema creation, and
//! verification.
//!
//! Call [`initialize_application_database`] once while the process boots,
//! never from request or task handling paths.

use diesel::Connection;
use diesel::sqlite::SqliteConnection;
use thiserror::Error;
use tracing::{error, info, warn};

use super::error::StorageError;
use super::pool::enable_foreign_keys;
use super::schema_manager::SchemaManager;

/// Outcome of a successful start-up initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    /// Tables created by this run, in creation order.
    pub created: Vec<&'static str>,
    /// Whether the schema was verified after creation.
    pub verified: bool,
}

/// Errors raised by [`try_initialize_application_database`].
#[derive(Debug, Error)]
pub enum InitializationError {
    /// Foreign-key enforcement could not be enabled.
    #[error("failed to enable foreign key enforcement: {0}")]
    ForeignKeys(#[source] StorageError),

    /// Schema creation failed; the transaction was rolled back.
    #[error("schema creation failed and was rolled back: {0}")]
    SchemaCreation(#[source] StorageError),

    /// Tables were still missing after creation; the transaction was rolled
    /// back.
    #[error("schema verification failed, missing tables: {}", .0.join(", "))]
    VerificationFailed(Vec<&'static str>),
}

impl From<diesel::result::Error> for InitializationError {
    fn from(err: diesel::result::Error) -> Self {
        Self::SchemaCreation(StorageError::from(err))
    }
}

/// Initializes the database, raising on failure.
///
/// Enables foreign keys, then creates missing tables inside one transaction
/// and, when `verify` is set, checks that every table exists before
/// committing.
///
/// # Errors
///
/// Returns [`InitializationError`] describing the failed step. Schema
/// changes are rolled back on every error path.
pub fn try_initialize_application_database(
    connection: &mut SqliteConnection,
    verify: bool,
) -> Result<SchemaReport, InitializationError> {
    enable_foreign_keys(connection).map_err(InitializationError::ForeignKeys)?;
    let manager = SchemaManager::new();

    let report = connection.transaction::<_, InitializationError, _>(|tx| {
        let created = manager
            .initialize_schema(tx)
            .map_err(InitializationError::SchemaCreation)?;
        if verify {
            let missing = manager
                .missing_tables(tx)
                .map_err(InitializationError::SchemaCreation)?;
            if !missing.is_empty() {
                return Err(InitializationError::VerificationFailed(missing));
            }
        }
        Ok(SchemaReport {
            created,
            verified: verify,
        })
    });

    match &report {
        Ok(done) if done.created.is_empty() => info!("database schema already initialized"),
        Ok(done) => info!(tables = ?done.created, "database schema initialized"),
        Err(err) => warn!(error = %err, "schema initialization rolled back"),
    }
    report
}

/// Initializes the database, returning `false` instead of raising.
///
/// See [`try_initialize_application_database`] for the steps performed.
#[must_use]
pub fn initialize_application_database(connection: &mut SqliteConnection, verify: bool) -> bool {
    match try_initialize_application_database(connection, verify) {
        Ok(_) => true,
        Err(err) => {
            error!(error = %err, "database initialization failed");
            false
        }
    }
}
