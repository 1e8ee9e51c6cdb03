//! Object models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::statement::{InsertRow, SqliteQuery};

/// Object lifecycle status, stored as an integer. Legacy objects are only
/// ever migrated once committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum ObjectStatus {
    Committed = 3,
}

/// One row of the `objects` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ObjectRow {
    pub project_id: Uuid,
    pub bucket_name: Vec<u8>,
    /// Encrypted object path.
    pub object_key: Vec<u8>,
    /// -1 for objects without version history.
    pub version: i64,
    /// Groups the object's segments.
    pub stream_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,

    pub status: ObjectStatus,
    pub segment_count: i32,

    pub encrypted_metadata_nonce: Vec<u8>,
}

impl ObjectRow {
    /// Version assigned to objects carried over from the unversioned layout.
    pub const DEFAULT_VERSION: i64 = -1;
}

impl InsertRow for ObjectRow {
    const TABLE: &'static str = "objects";
    const COLUMNS: &'static [&'static str] = &[
        "project_id",
        "bucket_name",
        "object_key",
        "version",
        "stream_id",
        "created_at",
        "expires_at",
        "status",
        "segment_count",
        "encrypted_metadata_nonce",
    ];

    fn bind<'q>(self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.project_id)
            .bind(self.bucket_name)
            .bind(self.object_key)
            .bind(self.version)
            .bind(self.stream_id)
            .bind(self.created_at)
            .bind(self.expires_at)
            .bind(self.status)
            .bind(self.segment_count)
            .bind(self.encrypted_metadata_nonce)
    }
}
