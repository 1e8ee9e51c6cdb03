//! Statement execution capability consumed by the migration.

use async_trait::async_trait;
use tracing::debug;

use crate::connection::MetabaseDb;
use crate::error::DbResult;
use crate::statement::{InsertRow, InsertStatement};

/// Destination that executes multi-row inserts.
#[async_trait]
pub trait Metabase: Send + Sync {
    /// Execute `statement` with the values of `rows` bound positionally.
    /// Returns the number of rows affected.
    async fn exec_insert<R: InsertRow>(
        &self,
        statement: &InsertStatement,
        rows: Vec<R>,
    ) -> DbResult<u64>;
}

#[async_trait]
impl Metabase for MetabaseDb {
    async fn exec_insert<R: InsertRow>(
        &self,
        statement: &InsertStatement,
        rows: Vec<R>,
    ) -> DbResult<u64> {
        statement.check::<R>(rows.len())?;

        let mut query = sqlx::query(statement.sql());
        for row in rows {
            query = row.bind(query);
        }

        let result = query.execute(self.pool()).await?;
        debug!(
            table = statement.table(),
            rows = result.rows_affected(),
            "Inserted batch"
        );
        Ok(result.rows_affected())
    }
}
