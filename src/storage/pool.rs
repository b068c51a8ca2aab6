//! Connection establishment, pooling, and blocking-operation helpers.
//!
//! `SQLite` only enforces foreign keys on connections that opted in, so every
//! pooled connection runs the pragmas in [`ConnectionPragmas`] on acquire.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sql_types::Integer;
use diesel::sqlite::SqliteConnection;
use std::time::Duration;

use super::error::{EntityKind, ErrorContext, StorageError, StorageResult, translate};

/// `SQLite` connection pool used by the workflow store.
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Connection checked out of a [`SqlitePool`].
pub type PooledSqliteConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Default time a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection pragmas applied when a connection is acquired.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionPragmas {
    busy_timeout: Duration,
}

impl Default for ConnectionPragmas {
    fn default() -> Self {
        Self::new(DEFAULT_BUSY_TIMEOUT)
    }
}

impl ConnectionPragmas {
    /// Creates pragmas with the given busy timeout.
    #[must_use]
    pub const fn new(busy_timeout: Duration) -> Self {
        Self { busy_timeout }
    }

    /// Applies the pragmas to `connection`.
    ///
    /// # Errors
    ///
    /// Returns the Diesel error raised by `SQLite`.
    pub fn apply(&self, connection: &mut SqliteConnection) -> QueryResult<()> {
        connection.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, connection: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        self.apply(connection).map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Opens a single connection, typically for start-up work.
///
/// # Errors
///
/// Returns [`StorageError::ConnectionFailure`] when the database cannot be
/// opened.
pub fn establish(database_url: &str) -> StorageResult<SqliteConnection> {
    SqliteConnection::establish(database_url).map_err(StorageError::connection)
}

/// Builds a connection pool whose connections enforce foreign keys.
///
/// # Errors
///
/// Returns [`StorageError::ConnectionFailure`] when the pool cannot open its
/// initial connections.
pub fn build_pool(database_url: &str, max_size: u32) -> StorageResult<SqlitePool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(ConnectionPragmas::default()))
        .build(manager)
        .map_err(StorageError::connection)
}

/// Turns on foreign-key enforcement for `connection`.
///
/// Must run outside a transaction; `SQLite` ignores the pragma otherwise.
///
/// # Errors
///
/// Returns a translated storage error when the pragma fails or does not take
/// effect.
pub fn enable_foreign_keys(connection: &mut SqliteConnection) -> StorageResult<()> {
    connection
        .batch_execute("PRAGMA foreign_keys = ON")
        .map_err(|err| translate(err, &ErrorContext::new(EntityKind::Schema)))?;
    if foreign_keys_enabled(connection)? {
        Ok(())
    } else {
        Err(StorageError::integrity(
            EntityKind::Schema,
            "foreign key enforcement could not be enabled",
        ))
    }
}

#[derive(Debug, QueryableByName)]
struct ForeignKeysRow {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}

/// Reports whether `connection` currently enforces foreign keys.
///
/// # Errors
///
/// Returns a translated storage error when the pragma query fails.
pub fn foreign_keys_enabled(connection: &mut SqliteConnection) -> StorageResult<bool> {
    let row = diesel::sql_query("PRAGMA foreign_keys")
        .get_result::<ForeignKeysRow>(connection)
        .map_err(|err| translate(err, &ErrorContext::new(EntityKind::Schema)))?;
    Ok(row.foreign_keys == 1)
}

/// Runs a blocking database operation on the blocking thread pool.
///
/// The closure receives a pooled connection; pool and join failures surface
/// as [`StorageError::ConnectionFailure`].
pub(crate) async fn run_blocking<F, T>(pool: &SqlitePool, f: F) -> StorageResult<T>
where
    F: FnOnce(&mut SqliteConnection) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get()?;
        f(&mut connection)
    })
    .await
    .map_err(StorageError::connection)?
}
