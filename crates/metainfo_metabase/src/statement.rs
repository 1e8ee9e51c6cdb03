//! Multi-row insert statement construction.
//!
//! Statement text depends only on the table, its columns and the number of
//! rows, so it can be built and checked without a database connection.

use std::fmt::Write;

use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

use crate::error::{DbError, DbResult};

/// Highest placeholder number SQLite accepts in one statement.
pub const MAX_PLACEHOLDERS: usize = 32_766;

/// Query type that rows bind their values into.
pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A row that can be written with a multi-row insert.
pub trait InsertRow: Send + 'static {
    const TABLE: &'static str;
    /// Column names, in bind order.
    const COLUMNS: &'static [&'static str];

    /// Bind this row's values, one per column, in [`Self::COLUMNS`] order.
    fn bind<'q>(self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Most rows one statement can carry without exceeding
    /// [`MAX_PLACEHOLDERS`].
    fn max_rows() -> usize {
        MAX_PLACEHOLDERS / Self::COLUMNS.len()
    }
}

/// `INSERT` statement text sized for an exact number of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: &'static str,
    columns: usize,
    rows: usize,
    sql: String,
}

impl InsertStatement {
    /// Statement inserting `rows` rows of `R`.
    pub fn for_rows<R: InsertRow>(rows: usize) -> Self {
        insert_statement(R::TABLE, R::COLUMNS, rows)
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn placeholder_count(&self) -> usize {
        self.columns * self.rows
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Verify the statement matches `rows` rows of `R` before binding.
    pub fn check<R: InsertRow>(&self, rows: usize) -> DbResult<()> {
        if self.table != R::TABLE || self.columns != R::COLUMNS.len() || self.rows != rows {
            return Err(DbError::PlaceholderMismatch {
                table: R::TABLE,
                expected: self.rows,
                actual: rows,
            });
        }
        Ok(())
    }
}

/// Build a multi-row insert with `columns.len() * rows` numbered placeholders.
///
/// ```text
/// INSERT INTO t (a, b) VALUES (?1, ?2), (?3, ?4)
/// ```
///
/// `rows` must be non-zero; callers never emit statements for empty batches.
pub fn insert_statement(table: &'static str, columns: &[&str], rows: usize) -> InsertStatement {
    debug_assert!(rows > 0, "insert statement for an empty batch");

    let width = columns.len();
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));
    sql.reserve(rows * width * 6);

    let mut placeholder = 1;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for column in 0..width {
            if column > 0 {
                sql.push_str(", ");
            }
            // writing into a String cannot fail
            let _ = write!(sql, "?{}", placeholder);
            placeholder += 1;
        }
        sql.push(')');
    }

    InsertStatement {
        table,
        columns: width,
        rows,
        sql,
    }
}
