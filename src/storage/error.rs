//! Typed storage errors and translation of low-level database failures.
//!
//! Adapters translate every Diesel, pool, or join failure through
//! [`translate`] so workflow code only ever matches on [`StorageError`]
//! variants and never on driver message text.

use diesel::r2d2::PoolError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared handle to the low-level error that caused a [`StorageError`].
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent entity kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityKind {
    /// Story aggregate rows.
    Story,
    /// Title revision rows.
    Title,
    /// Script revision rows.
    Script,
    /// Review audit rows.
    Review,
    /// Story-to-review link rows.
    StoryReview,
    /// Schema objects (tables, pragmas).
    Schema,
    /// The failing entity could not be determined.
    #[default]
    Unknown,
}

impl EntityKind {
    /// Returns a stable lowercase label for logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Title => "title",
            Self::Script => "script",
            Self::Review => "review",
            Self::StoryReview => "story review",
            Self::Schema => "schema",
            Self::Unknown => "entity",
        }
    }

    /// Maps a table name to the entity stored in it.
    #[must_use]
    pub fn from_table(table: &str) -> Self {
        match table {
            "stories" => Self::Story,
            "titles" => Self::Title,
            "scripts" => Self::Script,
            "reviews" => Self::Review,
            "story_reviews" => Self::StoryReview,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes what the failing operation was trying to touch.
///
/// Translation prefers the context over anything parsed from the driver
/// message; parsed table and column names only fill gaps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    entity: EntityKind,
    table: Option<String>,
    column: Option<String>,
    value: Option<String>,
}

impl ErrorContext {
    /// Creates a context for the given entity kind.
    #[must_use]
    pub const fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            table: None,
            column: None,
            value: None,
        }
    }

    /// Sets the table being written or read.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the column (or comma-separated column list) involved.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Sets the offending value, usually an identifier.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Returns the entity kind.
    #[must_use]
    pub const fn entity(&self) -> EntityKind {
        self.entity
    }

    /// Returns the table name, if known.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns the column name, if known.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Returns the offending value, if known.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Domain-level storage failures.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {key}")]
    EntityNotFound {
        /// Kind of the missing entity.
        entity: EntityKind,
        /// Lookup key that found nothing.
        key: String,
        /// Original driver error, when the lookup reached the driver.
        #[source]
        cause: Option<Cause>,
    },

    /// A unique constraint rejected the write.
    #[error("duplicate {entity}{}", describe_field(.column.as_deref(), .value.as_deref()))]
    DuplicateEntity {
        /// Kind of the duplicated entity.
        entity: EntityKind,
        /// Column or column list covered by the constraint.
        column: Option<String>,
        /// Conflicting value.
        value: Option<String>,
        /// Original driver error.
        #[source]
        cause: Option<Cause>,
    },

    /// A referenced row does not exist.
    #[error("foreign key violation on {entity}: {detail}")]
    ForeignKeyViolation {
        /// Kind of the entity being written.
        entity: EntityKind,
        /// Driver detail, if any.
        detail: String,
        /// Original driver error.
        #[source]
        cause: Option<Cause>,
    },

    /// A check or not-null constraint rejected the write.
    #[error("constraint violation on {entity}: {detail}")]
    ConstraintViolation {
        /// Kind of the entity being written.
        entity: EntityKind,
        /// Driver detail, if any.
        detail: String,
        /// Original driver error.
        #[source]
        cause: Option<Cause>,
    },

    /// The database could not be reached or the connection broke.
    #[error("storage connection failure: {detail}")]
    ConnectionFailure {
        /// Description of the failure.
        detail: String,
        /// Original error.
        #[source]
        cause: Option<Cause>,
    },

    /// Stored data or schema does not match what the domain expects.
    #[error("data integrity violation on {entity}: {detail}")]
    DataIntegrityViolation {
        /// Kind of the affected entity.
        entity: EntityKind,
        /// Description of the inconsistency.
        detail: String,
        /// Original error, if any.
        #[source]
        cause: Option<Cause>,
    },

    /// A guarded state change found the row in an unexpected state.
    #[error("invalid state transition for {entity} {id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Kind of the affected entity.
        entity: EntityKind,
        /// Identifier of the affected row.
        id: String,
        /// State observed in storage.
        from: String,
        /// State the caller tried to reach.
        to: String,
    },
}

fn describe_field(column: Option<&str>, value: Option<&str>) -> String {
    match (column, value) {
        (Some(column), Some(value)) => format!(" ({column} = {value})"),
        (Some(column), None) => format!(" ({column})"),
        (None, Some(value)) => format!(": {value}"),
        (None, None) => String::new(),
    }
}

impl StorageError {
    /// Creates an [`StorageError::EntityNotFound`] error.
    #[must_use]
    pub fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity,
            key: key.into(),
            cause: None,
        }
    }

    /// Creates a [`StorageError::ConnectionFailure`] wrapping `err`.
    #[must_use]
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ConnectionFailure {
            detail: err.to_string(),
            cause: Some(Arc::new(err)),
        }
    }

    /// Creates a [`StorageError::DataIntegrityViolation`] without a cause.
    #[must_use]
    pub fn integrity(entity: EntityKind, detail: impl Into<String>) -> Self {
        Self::DataIntegrityViolation {
            entity,
            detail: detail.into(),
            cause: None,
        }
    }

    /// Creates a [`StorageError::DataIntegrityViolation`] for a value that
    /// could not be decoded from storage.
    #[must_use]
    pub fn corrupt(
        entity: EntityKind,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::DataIntegrityViolation {
            entity,
            detail: err.to_string(),
            cause: Some(Arc::new(err)),
        }
    }

    /// Creates a [`StorageError::InvalidStateTransition`] error.
    #[must_use]
    pub fn invalid_transition(
        entity: EntityKind,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            id: id.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns `true` for [`StorageError::EntityNotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }

    /// Returns the entity kind carried by the error, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityKind> {
        match self {
            Self::EntityNotFound { entity, .. }
            | Self::DuplicateEntity { entity, .. }
            | Self::ForeignKeyViolation { entity, .. }
            | Self::ConstraintViolation { entity, .. }
            | Self::DataIntegrityViolation { entity, .. }
            | Self::InvalidStateTransition { entity, .. } => Some(*entity),
            Self::ConnectionFailure { .. } => None,
        }
    }
}

impl From<DieselError> for StorageError {
    fn from(err: DieselError) -> Self {
        translate(err, &ErrorContext::default())
    }
}

impl From<PoolError> for StorageError {
    fn from(err: PoolError) -> Self {
        Self::connection(err)
    }
}

/// Coarse classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Duplicate,
    ForeignKey,
    Constraint,
    Connection,
    Integrity,
}

/// Translates a Diesel error into the storage taxonomy.
///
/// The database error kind reported by the driver is trusted first; when the
/// driver reports an unknown kind the message text is inspected instead. The
/// original error is always kept as the cause.
#[must_use]
pub fn translate(err: DieselError, context: &ErrorContext) -> StorageError {
    if matches!(err, DieselError::NotFound) {
        return StorageError::EntityNotFound {
            entity: context.entity(),
            key: context.value().unwrap_or("<unknown>").to_owned(),
            cause: Some(Arc::new(err)),
        };
    }
    let (classification, message) = match &err {
        DieselError::DatabaseError(kind, info) => {
            let message = info.message().to_owned();
            (classify_kind(kind).unwrap_or_else(|| classify_message(&message)), message)
        }
        DieselError::DeserializationError(_) | DieselError::SerializationError(_) => {
            (Classification::Integrity, err.to_string())
        }
        other => {
            let message = other.to_string();
            (classify_message(&message), message)
        }
    };

    let parsed = ParsedTarget::from_message(&message);
    let entity = resolve_entity(context, &parsed);
    let cause: Cause = Arc::new(err);

    match classification {
        Classification::Duplicate => StorageError::DuplicateEntity {
            entity,
            column: context.column().map(str::to_owned).or(parsed.columns),
            value: context.value().map(str::to_owned),
            cause: Some(cause),
        },
        Classification::ForeignKey => StorageError::ForeignKeyViolation {
            entity,
            detail: message,
            cause: Some(cause),
        },
        Classification::Constraint => StorageError::ConstraintViolation {
            entity,
            detail: message,
            cause: Some(cause),
        },
        Classification::Connection => StorageError::ConnectionFailure {
            detail: message,
            cause: Some(cause),
        },
        Classification::Integrity => StorageError::DataIntegrityViolation {
            entity,
            detail: message,
            cause: Some(cause),
        },
    }
}

const fn classify_kind(kind: &DatabaseErrorKind) -> Option<Classification> {
    match kind {
        DatabaseErrorKind::UniqueViolation => Some(Classification::Duplicate),
        DatabaseErrorKind::ForeignKeyViolation => Some(Classification::ForeignKey),
        DatabaseErrorKind::NotNullViolation | DatabaseErrorKind::CheckViolation => {
            Some(Classification::Constraint)
        }
        DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
            Some(Classification::Connection)
        }
        _ => None,
    }
}

fn classify_message(message: &str) -> Classification {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("unique constraint") || lowered.contains("duplicate") {
        Classification::Duplicate
    } else if lowered.contains("foreign key") {
        Classification::ForeignKey
    } else if lowered.contains("constraint failed") || lowered.contains("violates") {
        Classification::Constraint
    } else if lowered.contains("unable to open database")
        || lowered.contains("database is locked")
        || lowered.contains("disk i/o error")
        || lowered.contains("connection")
    {
        Classification::Connection
    } else {
        Classification::Integrity
    }
}

fn resolve_entity(context: &ErrorContext, parsed: &ParsedTarget) -> EntityKind {
    if context.entity() != EntityKind::Unknown {
        return context.entity();
    }
    context
        .table()
        .or(parsed.table.as_deref())
        .map_or(EntityKind::Unknown, EntityKind::from_table)
}

/// Table and columns named by an `SQLite` constraint message such as
/// `UNIQUE constraint failed: titles.story_id, titles.version`.
#[derive(Debug, Default)]
struct ParsedTarget {
    table: Option<String>,
    columns: Option<String>,
}

impl ParsedTarget {
    fn from_message(message: &str) -> Self {
        let Some((_, targets)) = message.split_once("failed:") else {
            return Self::default();
        };
        let mut table = None;
        let mut columns = Vec::new();
        for target in targets.split(',').map(str::trim) {
            if let Some((table_name, column)) = target.split_once('.') {
                table.get_or_insert_with(|| table_name.to_owned());
                columns.push(column.to_owned());
            }
        }
        Self {
            table,
            columns: (!columns.is_empty()).then(|| columns.join(", ")),
        }
    }
}
