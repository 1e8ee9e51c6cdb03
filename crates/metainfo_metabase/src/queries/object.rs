//! Object-related database queries.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::ObjectRow;

/// Get all objects of a bucket, ordered by object key.
pub async fn get_objects(
    pool: &SqlitePool,
    project_id: &Uuid,
    bucket_name: &[u8],
) -> DbResult<Vec<ObjectRow>> {
    let objects = sqlx::query_as::<_, ObjectRow>(
        r#"
        SELECT
            project_id, bucket_name, object_key, version, stream_id,
            created_at, expires_at,
            status, segment_count,
            encrypted_metadata_nonce
        FROM objects
        WHERE project_id = ? AND bucket_name = ?
        ORDER BY object_key, version
        "#,
    )
    .bind(project_id)
    .bind(bucket_name)
    .fetch_all(pool)
    .await?;
    Ok(objects)
}

/// Count the objects of a bucket.
pub async fn count_objects(
    pool: &SqlitePool,
    project_id: &Uuid,
    bucket_name: &[u8],
) -> DbResult<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM objects WHERE project_id = ? AND bucket_name = ?",
    )
    .bind(project_id)
    .bind(bucket_name)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
