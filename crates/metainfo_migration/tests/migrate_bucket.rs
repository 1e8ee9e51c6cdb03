//! End-to-end bucket migrations from a sled pointer store into an in-memory
//! SQLite metabase.

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use metainfo_metabase::{
    DbResult, InsertRow, InsertStatement, Metabase, ObjectRow, ObjectStatus, SegmentRow, queries,
};
use metainfo_migration::{MigrationError, MigrationStats, Migrator};
use metainfo_pointerdb::{
    ListOptions, ListPage, PointerDb, PointerDbError, PointerDbResult, SegmentIndex, SegmentKey,
    SledPointerDb,
};
use pretty_assertions::assert_eq;

async fn stored_objects(metabase: &RecordingMetabase) -> Vec<ObjectRow> {
    queries::get_objects(metabase.inner.pool(), &PROJECT, BUCKET)
        .await
        .unwrap()
}

async fn stored_segments(metabase: &RecordingMetabase, object: &ObjectRow) -> Vec<SegmentRow> {
    queries::get_segments(metabase.inner.pool(), &object.stream_id)
        .await
        .unwrap()
}

/// Segment rows of an object satisfy the position and encryption invariants.
fn assert_segment_chain(object: &ObjectRow, segments: &[SegmentRow]) {
    let count = object.segment_count as u32;
    assert_eq!(segments.len(), count as usize);

    let positions: BTreeSet<u32> = segments.iter().map(|s| s.position().index).collect();
    assert_eq!(positions, (0..count).collect::<BTreeSet<_>>());
    assert!(segments.iter().all(|s| s.position().part == 0));

    for segment in segments {
        let index = segment.position().index;
        assert_eq!(segment.stream_id, object.stream_id);
        assert_eq!(i64::from(segment.encrypted_data_size), segment_size(index));
        assert_eq!(segment.unencrypted_data_size, 0);
        if index == count - 1 {
            assert_eq!(segment.encrypted_key, LAST_KEY);
            assert_eq!(segment.encrypted_key_nonce, LAST_NONCE);
        } else {
            assert!(!segment.has_encryption_key(), "segment {index} carries a key");
        }
    }
}

#[tokio::test]
async fn test_single_segment_object() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    let terminal = put_object(&pointerdb, BUCKET, "enc/single", 1);
    let pointerdb = CountingPointerDb::new(pointerdb);
    let metabase = RecordingMetabase::in_memory().await;

    let stats = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .migrate_bucket()
        .await
        .unwrap();
    assert_eq!(
        stats,
        MigrationStats {
            objects_created: 1,
            segments_created: 1
        }
    );
    assert!(pointerdb.fetches().is_empty());

    let objects = stored_objects(&metabase).await;
    assert_eq!(objects.len(), 1);
    let object = &objects[0];
    assert_eq!(object.object_key, b"enc/single");
    assert_eq!(object.bucket_name, BUCKET);
    assert_eq!(object.version, -1);
    assert_eq!(object.status, ObjectStatus::Committed);
    assert_eq!(object.segment_count, 1);
    assert_eq!(object.created_at.timestamp(), CREATED_SECS);
    assert_eq!(object.expires_at, None);
    assert_eq!(object.encrypted_metadata_nonce, terminal.metadata);

    let segments = stored_segments(&metabase, object).await;
    assert_segment_chain(object, &segments);
    assert_eq!(segments[0].inline_data, b"inline tail");
    assert!(segments[0].root_piece_id.is_empty());
}

#[tokio::test]
async fn test_three_segment_object_uses_one_bulk_fetch() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    put_object(&pointerdb, BUCKET, "enc/three", 3);
    let pointerdb = CountingPointerDb::new(pointerdb);
    let metabase = RecordingMetabase::in_memory().await;

    let stats = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .migrate_bucket()
        .await
        .unwrap();
    assert_eq!(stats.objects_created, 1);
    assert_eq!(stats.segments_created, 3);

    let expected_keys: Vec<Vec<u8>> = (0..2)
        .map(|index| {
            SegmentKey::new(PROJECT, SegmentIndex::Index(index), BUCKET, b"enc/three").encode()
        })
        .collect();
    assert_eq!(pointerdb.fetches(), vec![expected_keys]);

    let objects = stored_objects(&metabase).await;
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].segment_count, 3);

    let segments = stored_segments(&metabase, &objects[0]).await;
    assert_segment_chain(&objects[0], &segments);
    assert_eq!(segments[0].root_piece_id, vec![0u8; 32]);
    assert_eq!(segments[1].root_piece_id, vec![1u8; 32]);
}

#[tokio::test]
async fn test_zero_segment_object_aborts_after_flushed_batches() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    put_object(&pointerdb, BUCKET, "a-first", 1);
    put_object(&pointerdb, BUCKET, "b-empty", 0);
    put_object(&pointerdb, BUCKET, "c-never", 1);
    let metabase = RecordingMetabase::in_memory().await;

    let mut migrator = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET).with_batch_size(1);
    let err = migrator.migrate_bucket().await.unwrap_err();
    assert!(matches!(err, MigrationError::UnsupportedCase { ref key } if key == "b-empty"));

    // the first object was flushed before the failure and stays
    assert_eq!(
        migrator.stats(),
        MigrationStats {
            objects_created: 1,
            segments_created: 1
        }
    );
    let objects = stored_objects(&metabase).await;
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].object_key, b"a-first");
    assert_eq!(metabase.inner.stats().await.unwrap().segment_count, 1);
}

#[tokio::test]
async fn test_batches_flush_at_threshold_and_remainder() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    for i in 0..501 {
        put_object(&pointerdb, BUCKET, &format!("obj{:04}", i), 1);
    }
    let metabase = RecordingMetabase::in_memory().await;

    let stats = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .with_batch_size(500)
        .migrate_bucket()
        .await
        .unwrap();

    assert_eq!(stats.objects_created, 501);
    assert_eq!(stats.segments_created, 501);
    assert_eq!(metabase.executed("objects"), vec![(500, 5000), (1, 10)]);
    assert_eq!(metabase.executed("segments"), vec![(500, 4500), (1, 9)]);

    let counts = metabase.inner.stats().await.unwrap();
    assert_eq!(counts.object_count, 501);
    assert_eq!(counts.segment_count, 501);
}

#[tokio::test]
async fn test_counters_match_rows_across_mixed_objects_and_pages() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    let mut expected_segments = 0;
    for i in 0..20 {
        let segments = i % 4 + 1;
        put_object(&pointerdb, BUCKET, &format!("mixed/{:02}", i), segments);
        expected_segments += segments as u64;
    }
    // neighbours that must not be picked up
    put_object(&pointerdb, b"photos-archive", "other", 2);
    put_object(&pointerdb, b"album", "other", 1);
    let metabase = RecordingMetabase::in_memory().await;

    let stats = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .with_batch_size(7)
        .with_list_limit(3)
        .migrate_bucket()
        .await
        .unwrap();

    assert_eq!(stats.objects_created, 20);
    assert_eq!(stats.segments_created, expected_segments);

    let flushed: usize = metabase
        .executed("segments")
        .iter()
        .map(|(rows, _)| rows)
        .sum();
    assert_eq!(flushed as u64, stats.segments_created);
    assert!(metabase.executed("segments").iter().all(|(rows, placeholders)| {
        *rows <= 7 && *placeholders == rows * 9
    }));

    let objects = stored_objects(&metabase).await;
    assert_eq!(objects.len(), 20);
    for object in &objects {
        let segments = stored_segments(&metabase, object).await;
        assert_segment_chain(object, &segments);
    }
}

#[tokio::test]
async fn test_missing_middle_segment_aborts() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    put_object(&pointerdb, BUCKET, "zombie", 3);
    let middle = SegmentKey::new(PROJECT, SegmentIndex::Index(1), BUCKET, b"zombie");
    pointerdb.remove(middle.encode()).unwrap();
    let metabase = RecordingMetabase::in_memory().await;

    let err = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .migrate_bucket()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Store(PointerDbError::KeyNotFound { .. })
    ));
    assert_eq!(metabase.inner.stats().await.unwrap().object_count, 0);
}

#[tokio::test]
async fn test_undecodable_pointer_aborts() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    put_object(&pointerdb, BUCKET, "a-good", 1);
    let broken = SegmentKey::new(PROJECT, SegmentIndex::Last, BUCKET, b"b-broken").encode();
    pointerdb.put(&broken, [0x42, 0x7f]).unwrap();
    let metabase = RecordingMetabase::in_memory().await;

    let mut migrator = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET);
    let err = migrator.migrate_bucket().await.unwrap_err();
    assert!(matches!(err, MigrationError::Decode { record: "pointer", .. }), "{err:?}");

    // nothing reached the default-sized batches
    assert_eq!(migrator.stats(), MigrationStats::default());
    assert!(metabase.executed("objects").is_empty());
}

#[tokio::test]
async fn test_rooted_paths_keep_their_leading_separator() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    put_object(&pointerdb, BUCKET, "/rooted", 1);
    put_object(&pointerdb, BUCKET, "/rooted/three", 3);
    put_object(&pointerdb, BUCKET, "//doubly", 2);
    let pointerdb = CountingPointerDb::new(pointerdb);
    let metabase = RecordingMetabase::in_memory().await;

    let stats = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .migrate_bucket()
        .await
        .unwrap();
    assert_eq!(
        stats,
        MigrationStats {
            objects_created: 3,
            segments_created: 6
        }
    );

    let objects = stored_objects(&metabase).await;
    let keys: BTreeSet<&[u8]> = objects.iter().map(|o| o.object_key.as_slice()).collect();
    let expected: BTreeSet<&[u8]> = [&b"/rooted"[..], &b"/rooted/three"[..], &b"//doubly"[..]]
        .into_iter()
        .collect();
    assert_eq!(keys, expected);
    for object in &objects {
        let segments = stored_segments(&metabase, object).await;
        assert_segment_chain(object, &segments);
    }

    let fetched: BTreeSet<Vec<u8>> = pointerdb.fetches().into_iter().flatten().collect();
    let path = |index: u32, encrypted_path: &[u8]| {
        SegmentKey::new(PROJECT, SegmentIndex::Index(index), BUCKET, encrypted_path).encode()
    };
    let expected: BTreeSet<Vec<u8>> = [
        path(0, b"/rooted/three"),
        path(1, b"/rooted/three"),
        path(0, b"//doubly"),
    ]
    .into_iter()
    .collect();
    assert_eq!(fetched, expected);
}

/// Store whose listing never completes.
struct StalledPointerDb;

#[async_trait]
impl PointerDb for StalledPointerDb {
    async fn list(&self, _options: &ListOptions) -> PointerDbResult<ListPage> {
        std::future::pending().await
    }

    async fn get_all(&self, _keys: &[Vec<u8>]) -> PointerDbResult<Vec<Vec<u8>>> {
        std::future::pending().await
    }
}

/// Metabase for runs that must fail before anything is flushed.
struct UnreachableMetabase;

#[async_trait]
impl Metabase for UnreachableMetabase {
    async fn exec_insert<R: InsertRow>(
        &self,
        _statement: &InsertStatement,
        _rows: Vec<R>,
    ) -> DbResult<u64> {
        unreachable!("nothing is flushed before the deadline")
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_expiry_is_fatal() {
    let mut migrator = Migrator::new(&StalledPointerDb, &UnreachableMetabase, PROJECT, BUCKET);

    let err = migrator
        .migrate_bucket_within(Some(Duration::from_secs(30)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Timeout { ref bucket, seconds: 30 } if bucket == "photos"
    ));
    assert_eq!(migrator.stats(), MigrationStats::default());
}

#[tokio::test]
async fn test_empty_bucket_emits_no_statements() {
    let pointerdb = SledPointerDb::temporary().unwrap();
    put_object(&pointerdb, b"elsewhere", "object", 1);
    let metabase = RecordingMetabase::in_memory().await;

    let stats = Migrator::new(&pointerdb, &metabase, PROJECT, BUCKET)
        .migrate_bucket_within(None)
        .await
        .unwrap();
    assert_eq!(stats, MigrationStats::default());
    assert!(metabase.statements.lock().unwrap().is_empty());
}
