//! Database connection management.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Tables the migration writes into.
const REQUIRED_TABLES: [&str; 2] = ["objects", "segments"];

/// Connection to the destination metabase.
#[derive(Debug, Clone)]
pub struct MetabaseDb {
    pool: SqlitePool,
}

impl MetabaseDb {
    /// Open or create a metabase database at the given path.
    ///
    /// The schema is not touched; call [`MetabaseDb::ensure_schema`] before
    /// writing, or [`MetabaseDb::apply_schema`] to create it.
    pub async fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening metabase database: {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("cache_size", "-64000") // 64MB cache
            .pragma("synchronous", "NORMAL") // Safe with WAL
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        debug!("Database connection established");

        Ok(Self { pool })
    }

    /// Open an in-memory database with the schema applied (for testing).
    pub async fn open_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1) // In-memory must be single connection to share state
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.apply_schema().await?;
        Ok(db)
    }

    /// Create the `objects` and `segments` tables.
    pub async fn apply_schema(&self) -> DbResult<()> {
        debug!("Running metabase migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Metabase migrations complete");
        Ok(())
    }

    /// Fail unless every table the migration writes into exists.
    pub async fn ensure_schema(&self) -> DbResult<()> {
        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name IN ('objects', 'segments')",
        )
        .fetch_all(&self.pool)
        .await?;

        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|table| !existing.iter().any(|name| name == table))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DbError::SchemaMissing {
                missing: missing.join(", "),
            })
        }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get row counts of the destination tables.
    pub async fn stats(&self) -> DbResult<MetabaseStats> {
        let objects: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM objects")
            .fetch_one(&self.pool)
            .await?;

        let segments: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM segments")
            .fetch_one(&self.pool)
            .await?;

        Ok(MetabaseStats {
            object_count: objects.0 as u64,
            segment_count: segments.0 as u64,
        })
    }

    /// Checkpoint the WAL file.
    pub async fn checkpoint(&self) -> DbResult<()> {
        debug!("Checkpointing WAL");
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Destination row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetabaseStats {
    pub object_count: u64,
    pub segment_count: u64,
}
