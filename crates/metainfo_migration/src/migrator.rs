//! Per-bucket migration driver.

use std::fmt;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

use metainfo_metabase::{Metabase, ObjectRow, SegmentRow};
use metainfo_pointerdb::{
    DEFAULT_LIST_LIMIT, ListCursor, ListOptions, PointerDb, decode_pointer, path,
};
use tracing::{info, trace};
use uuid::Uuid;

use crate::assemble::ObjectAssembler;
use crate::batch::{BatchWriter, DEFAULT_BATCH_SIZE};
use crate::error::{MigrationError, MigrationResult};

/// Rows created by a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub objects_created: u64,
    pub segments_created: u64,
}

impl AddAssign for MigrationStats {
    fn add_assign(&mut self, other: Self) {
        self.objects_created += other.objects_created;
        self.segments_created += other.segments_created;
    }
}

impl fmt::Display for MigrationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects, {} segments",
            self.objects_created, self.segments_created
        )
    }
}

/// Migrates every object of one bucket from the pointer store into the
/// metabase.
///
/// Listing, segment fetches and flushes run strictly one after another.
/// Any error ends the run; rows flushed before it stay in the metabase and
/// rows still buffered are dropped.
pub struct Migrator<'a, P: ?Sized, M> {
    pointerdb: &'a P,
    metabase: &'a M,

    project_id: Uuid,
    bucket: Vec<u8>,
    list_limit: usize,

    objects: BatchWriter<ObjectRow>,
    segments: BatchWriter<SegmentRow>,
}

impl<'a, P, M> Migrator<'a, P, M>
where
    P: PointerDb + ?Sized,
    M: Metabase,
{
    pub fn new(
        pointerdb: &'a P,
        metabase: &'a M,
        project_id: Uuid,
        bucket: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            pointerdb,
            metabase,
            project_id,
            bucket: bucket.into(),
            list_limit: DEFAULT_LIST_LIMIT,
            objects: BatchWriter::new(DEFAULT_BATCH_SIZE),
            segments: BatchWriter::new(DEFAULT_BATCH_SIZE),
        }
    }

    /// Rows per insert statement, for both tables.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.objects = BatchWriter::new(batch_size);
        self.segments = BatchWriter::new(batch_size);
        self
    }

    /// Keys per listing page.
    pub fn with_list_limit(mut self, list_limit: usize) -> Self {
        self.list_limit = list_limit;
        self
    }

    /// Migrate the whole bucket and flush every remaining row.
    pub async fn migrate_bucket(&mut self) -> MigrationResult<MigrationStats> {
        let started = Instant::now();
        info!(
            project_id = %self.project_id,
            bucket = %self.bucket_name(),
            "Migrating bucket"
        );

        let prefix = path::bucket_prefix(&self.project_id, &self.bucket);
        let mut cursor =
            ListCursor::new(ListOptions::recursive(prefix).with_limit(self.list_limit));
        let assembler = ObjectAssembler::new(self.pointerdb, self.project_id, &self.bucket);

        while let Some(page) = cursor.next_page(self.pointerdb).await? {
            for item in page {
                // the bucket prefix ends in the separator, so the relative key
                // is the encrypted path as stored, leading `/` included
                let encrypted_path = item.key.as_slice();

                let pointer = decode_pointer(&item.value)
                    .map_err(|source| MigrationError::decode("pointer", &item.key, source))?;

                let assembled = assembler.assemble(encrypted_path, &pointer).await?;
                trace!(
                    stream_id = %assembled.object.stream_id,
                    segments = assembled.segments.len(),
                    "Assembled object"
                );

                self.objects.push(self.metabase, assembled.object).await?;
                for segment in assembled.segments {
                    self.segments.push(self.metabase, segment).await?;
                }
            }
        }

        self.objects.finish(self.metabase).await?;
        self.segments.finish(self.metabase).await?;

        let stats = self.stats();
        info!(
            bucket = %self.bucket_name(),
            objects = stats.objects_created,
            segments = stats.segments_created,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bucket migrated"
        );
        Ok(stats)
    }

    /// [`Migrator::migrate_bucket`] bounded by an optional deadline.
    pub async fn migrate_bucket_within(
        &mut self,
        deadline: Option<Duration>,
    ) -> MigrationResult<MigrationStats> {
        let Some(deadline) = deadline else {
            return self.migrate_bucket().await;
        };

        let bucket = self.bucket_name();
        match tokio::time::timeout(deadline, self.migrate_bucket()).await {
            Ok(result) => result,
            Err(_) => Err(MigrationError::Timeout {
                bucket,
                seconds: deadline.as_secs(),
            }),
        }
    }

    /// Rows durably created so far.
    pub fn stats(&self) -> MigrationStats {
        MigrationStats {
            objects_created: self.objects.created(),
            segments_created: self.segments.created(),
        }
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn bucket_name(&self) -> String {
        String::from_utf8_lossy(&self.bucket).into_owned()
    }
}
