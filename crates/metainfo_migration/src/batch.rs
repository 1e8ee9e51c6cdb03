//! Buffered multi-row inserts.

use metainfo_metabase::{InsertRow, InsertStatement, Metabase, ObjectRow, SegmentRow};
use tracing::debug;

use crate::error::MigrationResult;

/// Rows per insert statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Largest batch size both the object and the segment statements can carry.
pub fn max_batch_size() -> usize {
    ObjectRow::max_rows().min(SegmentRow::max_rows())
}

/// Buffers rows of one table and writes them as multi-row inserts.
///
/// A full batch reuses the statement prebuilt for the batch size; any other
/// row count gets a statement built for exactly that many rows.
#[derive(Debug)]
pub struct BatchWriter<R> {
    batch_size: usize,
    full_batch: InsertStatement,
    rows: Vec<R>,
    created: u64,
}

impl<R: InsertRow> BatchWriter<R> {
    /// The batch size is clamped to `1..=R::max_rows()`.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.clamp(1, R::max_rows());
        Self {
            batch_size,
            full_batch: InsertStatement::for_rows::<R>(batch_size),
            rows: Vec::with_capacity(batch_size),
            created: 0,
        }
    }

    /// Buffer a row, flushing once the buffer reaches the batch size.
    pub async fn push<M: Metabase>(&mut self, metabase: &M, row: R) -> MigrationResult<()> {
        self.rows.push(row);
        if self.rows.len() >= self.batch_size {
            self.flush(metabase).await?;
        }
        Ok(())
    }

    /// Flush whatever is buffered. Nothing is sent for an empty buffer.
    pub async fn finish<M: Metabase>(&mut self, metabase: &M) -> MigrationResult<()> {
        self.flush(metabase).await
    }

    async fn flush<M: Metabase>(&mut self, metabase: &M) -> MigrationResult<()> {
        if self.rows.is_empty() {
            return Ok(());
        }

        let rows = std::mem::replace(&mut self.rows, Vec::with_capacity(self.batch_size));
        let count = rows.len();

        let partial;
        let statement = if count == self.batch_size {
            &self.full_batch
        } else {
            partial = InsertStatement::for_rows::<R>(count);
            &partial
        };

        metabase.exec_insert(statement, rows).await?;
        self.created += count as u64;
        debug!(
            table = R::TABLE,
            rows = count,
            total = self.created,
            "Flushed batch"
        );
        Ok(())
    }

    /// Rows durably inserted so far.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Rows waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.rows.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
