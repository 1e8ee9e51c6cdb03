//! Error types for the metabase layer.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for metabase operations.
pub type DbResult<T> = Result<T, DbError>;

/// Metabase error types.
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    /// SQLite/sqlx error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error (creating the database directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Statement built for a different number of rows than supplied
    #[error("Statement for {table} has placeholders for {expected} rows, got {actual}")]
    #[diagnostic(help("Insert statements must be rebuilt whenever the batch row count changes"))]
    PlaceholderMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Destination tables are missing
    #[error("Metabase schema is missing table(s): {missing}")]
    #[diagnostic(help("Run `metainfo-migration init-schema` against the destination first"))]
    SchemaMissing { missing: String },
}
