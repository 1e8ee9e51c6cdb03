//! Segment-related database queries.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SegmentRow;

/// Get all segments of a stream, ordered by position.
pub async fn get_segments(pool: &SqlitePool, stream_id: &Uuid) -> DbResult<Vec<SegmentRow>> {
    let segments = sqlx::query_as::<_, SegmentRow>(
        r#"
        SELECT
            stream_id, segment_position, root_piece_id,
            encrypted_key, encrypted_key_nonce,
            encrypted_data_size, unencrypted_data_size, inline_data,
            node_aliases
        FROM segments
        WHERE stream_id = ?
        ORDER BY segment_position
        "#,
    )
    .bind(stream_id)
    .fetch_all(pool)
    .await?;
    Ok(segments)
}
