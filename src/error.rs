use thiserror::Error;

/// Top-level error type for the crate.
///
/// Driver and pool errors pass through transparently; everything the
/// binding layer itself detects is grouped by pipeline stage so callers can
/// match on the stage that failed.
#[derive(Debug, Error)]
pub enum PgBindError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Access(#[from] AccessError),

    /// A transaction rollback failed after the work closure already
    /// returned an error. Both errors are preserved; the rollback failure
    /// supersedes the original as the returned error.
    #[error("rollback failed: {rollback} (while handling: {original})")]
    RollbackFailed {
        original: Box<PgBindError>,
        rollback: Box<PgBindError>,
    },
}

/// Errors detected while compiling an annotated SQL template.
///
/// Not retryable without fixing the template text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `@` or `#` sigil with no key letters after it.
    #[error("empty key at offset {offset}")]
    EmptyKey { offset: usize },

    /// A sigil appeared while a key was still being collected.
    #[error("invalid key at offset {offset}")]
    InvalidKey { offset: usize },
}

/// Errors detected while resolving binding instructions against a model
/// value and an argument map. Nothing is sent to the executor when binding
/// fails.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("model field not found: {0}")]
    FieldNotFound(String),

    #[error("argument not found: {0}")]
    ArgumentNotFound(String),

    #[error("cannot use a sequence as a binding source")]
    SequenceSource,

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Errors detected while mapping result rows onto a destination.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A single-struct destination received zero rows.
    #[error("no rows returned for a single-struct destination")]
    NoRows,

    /// A single-struct destination received more than one row.
    #[error("too many rows returned for a single-struct destination")]
    TooManyRows,

    /// A result column had no matching model field and the caller asked for
    /// unknown columns to be rejected.
    #[error("no model field matches result column {0:?}")]
    UnknownColumn(String),

    /// A setter rejected the value extracted from a result column.
    #[error("column {column:?}: {source}")]
    Column { column: String, source: AccessError },
}

/// Errors raised by compiled field accessors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The value cannot be converted to the field's representation.
    #[error("incompatible value: cannot store {value} into {target}")]
    Incompatible {
        value: &'static str,
        target: &'static str,
    },

    /// The supplied model value is not the type the shape was built for.
    #[error("model value does not match registered shape (expected {expected})")]
    ShapeMismatch { expected: &'static str },

    /// Shape nesting exceeded the supported depth.
    #[error("embedded shapes nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}
