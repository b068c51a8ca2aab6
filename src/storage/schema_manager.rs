//! Idempotent, additive schema creation and verification.
//!
//! Tables are created in foreign-key dependency order. Only missing tables
//! are created; existing tables are never dropped or altered.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use super::error::{EntityKind, ErrorContext, StorageResult, translate};

/// Storage strings accepted by the `stories.state` check constraint.
pub const STORY_STATE_VALUES: [&str; 9] = [
    "title_draft",
    "awaiting_title_review",
    "title_refinement",
    "script_draft",
    "awaiting_script_review",
    "script_refinement",
    "awaiting_expert_review",
    "published",
    "archived",
];

/// A table owned by the workflow store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDefinition {
    name: &'static str,
    ddl: &'static str,
}

impl TableDefinition {
    /// Returns the table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the `CREATE TABLE` statement.
    #[must_use]
    pub const fn ddl(&self) -> &'static str {
        self.ddl
    }
}

const REVIEWS: TableDefinition = TableDefinition {
    name: "reviews",
    ddl: "CREATE TABLE reviews (
        id TEXT PRIMARY KEY NOT NULL,
        text TEXT NOT NULL,
        score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
        created_at TIMESTAMP NOT NULL
    )",
};

const STORIES: TableDefinition = TableDefinition {
    name: "stories",
    ddl: "CREATE TABLE stories (
        id TEXT PRIMARY KEY NOT NULL,
        idea_id TEXT NOT NULL,
        current_title_id TEXT,
        current_script_id TEXT,
        state TEXT NOT NULL CHECK (state IN (
            'title_draft', 'awaiting_title_review', 'title_refinement',
            'script_draft', 'awaiting_script_review', 'script_refinement',
            'awaiting_expert_review', 'published', 'archived'
        )),
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )",
};

const TITLES: TableDefinition = TableDefinition {
    name: "titles",
    ddl: "CREATE TABLE titles (
        id TEXT PRIMARY KEY NOT NULL,
        story_id TEXT NOT NULL REFERENCES stories (id),
        version INTEGER NOT NULL CHECK (version > 0),
        text TEXT NOT NULL,
        review_id TEXT REFERENCES reviews (id),
        created_at TIMESTAMP NOT NULL,
        CONSTRAINT titles_story_version_unique UNIQUE (story_id, version)
    )",
};

const SCRIPTS: TableDefinition = TableDefinition {
    name: "scripts",
    ddl: "CREATE TABLE scripts (
        id TEXT PRIMARY KEY NOT NULL,
        story_id TEXT NOT NULL REFERENCES stories (id),
        version INTEGER NOT NULL CHECK (version > 0),
        text TEXT NOT NULL,
        review_id TEXT REFERENCES reviews (id),
        created_at TIMESTAMP NOT NULL,
        CONSTRAINT scripts_story_version_unique UNIQUE (story_id, version)
    )",
};

const STORY_REVIEWS: TableDefinition = TableDefinition {
    name: "story_reviews",
    ddl: "CREATE TABLE story_reviews (
        story_id TEXT NOT NULL REFERENCES stories (id),
        review_id TEXT NOT NULL REFERENCES reviews (id),
        version INTEGER NOT NULL CHECK (version > 0),
        review_type TEXT NOT NULL,
        PRIMARY KEY (story_id, review_id)
    )",
};

/// Creation order respecting foreign-key dependencies.
pub const TABLE_CREATION_ORDER: [TableDefinition; 5] =
    [REVIEWS, STORIES, TITLES, SCRIPTS, STORY_REVIEWS];

#[derive(Debug, QueryableByName)]
struct TableNameRow {
    #[diesel(sql_type = Text)]
    name: String,
}

/// Creates and verifies the workflow tables.
#[derive(Debug, Clone, Copy)]
pub struct SchemaManager {
    tables: &'static [TableDefinition],
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaManager {
    /// Creates a manager for the standard workflow tables.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: &TABLE_CREATION_ORDER,
        }
    }

    /// Returns the managed tables in creation order.
    #[must_use]
    pub const fn tables(&self) -> &'static [TableDefinition] {
        self.tables
    }

    /// Lists user tables currently present in the database, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns a translated [`StorageError`](super::StorageError) when the
    /// catalogue query fails.
    pub fn existing_tables(&self, connection: &mut SqliteConnection) -> StorageResult<Vec<String>> {
        let rows = diesel::sql_query(concat!(
            "SELECT name FROM sqlite_master ",
            "WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ",
            "ORDER BY name",
        ))
        .load::<TableNameRow>(connection)
        .map_err(|err| translate(err, &ErrorContext::new(EntityKind::Schema)))?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    /// Returns managed tables that do not exist yet, in creation order.
    ///
    /// # Errors
    ///
    /// Returns a translated storage error when the catalogue query fails.
    pub fn missing_tables(
        &self,
        connection: &mut SqliteConnection,
    ) -> StorageResult<Vec<&'static str>> {
        let existing = self.existing_tables(connection)?;
        Ok(self
            .tables
            .iter()
            .map(TableDefinition::name)
            .filter(|name| !existing.iter().any(|table| table == name))
            .collect())
    }

    /// Returns `true` when every managed table exists.
    ///
    /// # Errors
    ///
    /// Returns a translated storage error when the catalogue query fails.
    pub fn verify_schema(&self, connection: &mut SqliteConnection) -> StorageResult<bool> {
        Ok(self.missing_tables(connection)?.is_empty())
    }

    /// Creates the managed tables that are missing and returns their names.
    ///
    /// Re-running after a successful call creates nothing and returns an
    /// empty list. The caller owns the surrounding transaction.
    ///
    /// # Errors
    ///
    /// Returns a translated storage error naming the table that failed.
    pub fn initialize_schema(
        &self,
        connection: &mut SqliteConnection,
    ) -> StorageResult<Vec<&'static str>> {
        let missing = self.missing_tables(connection)?;
        let mut created = Vec::with_capacity(missing.len());
        for table in self.tables.iter().filter(|table| missing.contains(&table.name)) {
            connection.batch_execute(table.ddl).map_err(|err| {
                translate(
                    err,
                    &ErrorContext::new(EntityKind::Schema).with_table(table.name),
                )
            })?;
            debug!(table = table.name, "created table");
            created.push(table.name);
        }
        Ok(created)
    }
}
