//! Relational storage foundation shared by the workflow store.
//!
//! - [`error`]: typed storage errors and driver-error translation
//! - [`schema_manager`]: idempotent, additive table creation
//! - [`startup`]: one-shot start-up initialization
//! - [`pool`]: connection pooling and blocking helpers

pub mod error;
pub mod pool;
pub mod schema;
pub mod schema_manager;
pub mod startup;

pub use error::{Cause, EntityKind, ErrorContext, StorageError, StorageResult, translate};
pub use pool::{
    ConnectionPragmas, PooledSqliteConnection, SqlitePool, build_pool, enable_foreign_keys,
    establish, foreign_keys_enabled,
};
pub use schema_manager::{SchemaManager, STORY_STATE_VALUES, TABLE_CREATION_ORDER, TableDefinition};
pub use startup::{
    InitializationError, SchemaReport, initialize_application_database,
    try_initialize_application_database,
};

#[cfg(test)]
mod tests;
