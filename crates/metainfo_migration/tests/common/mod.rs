//! Shared fixtures for migration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use metainfo_metabase::{DbResult, InsertRow, InsertStatement, Metabase, MetabaseDb};
use metainfo_pointerdb::pb::{RemoteSegment, SegmentMeta, StreamMeta};
use metainfo_pointerdb::{
    ListOptions, ListPage, Pointer, PointerDb, PointerDbResult, SegmentIndex, SegmentKey,
    SledPointerDb,
};
use prost::Message;
use prost_types::Timestamp;
use uuid::Uuid;

pub const PROJECT: Uuid = Uuid::from_u128(0x6b3e_1c5a_84f2_4d1e_9a0b_2c3d_4e5f_6071);
pub const BUCKET: &[u8] = b"photos";
pub const CREATED_SECS: i64 = 1_600_000_000;

pub const LAST_KEY: &[u8] = b"last-segment-key";
pub const LAST_NONCE: &[u8] = b"last-segment-nonce";

/// Encrypted data size written for segment `index`, so rows can be traced
/// back to the pointer they came from.
pub fn segment_size(index: u32) -> i64 {
    100 + i64::from(index)
}

/// Store a legacy object with `segments` segments: the terminal pointer
/// under the `l` key and every other segment under its `s{index}` key.
pub fn put_object(db: &SledPointerDb, bucket: &[u8], path: &str, segments: i64) -> Pointer {
    let last_index = u32::try_from(segments.max(1) - 1).unwrap();
    for index in 0..last_index {
        let segment = Pointer {
            segment_size: segment_size(index),
            remote: Some(RemoteSegment {
                root_piece_id: vec![index as u8; 32],
            }),
            creation_date: Some(Timestamp {
                seconds: CREATED_SECS,
                nanos: 0,
            }),
            // per-segment encryption info is not carried over
            metadata: SegmentMeta {
                encrypted_key: b"middle-key".to_vec(),
                key_nonce: b"middle-nonce".to_vec(),
            }
            .encode_to_vec(),
            ..Default::default()
        };
        let key = SegmentKey::new(PROJECT, SegmentIndex::Index(index), bucket, path.as_bytes());
        db.put(key.encode(), segment.encode_to_vec()).unwrap();
    }

    let terminal = Pointer {
        segment_size: segment_size(last_index),
        inline_segment: b"inline tail".to_vec(),
        creation_date: Some(Timestamp {
            seconds: CREATED_SECS,
            nanos: 0,
        }),
        metadata: StreamMeta {
            number_of_segments: segments,
            last_segment_meta: Some(SegmentMeta {
                encrypted_key: LAST_KEY.to_vec(),
                key_nonce: LAST_NONCE.to_vec(),
            }),
            ..Default::default()
        }
        .encode_to_vec(),
        ..Default::default()
    };
    let key = SegmentKey::new(PROJECT, SegmentIndex::Last, bucket, path.as_bytes());
    db.put(key.encode(), terminal.encode_to_vec()).unwrap();
    terminal
}

/// Pointer store wrapper that records every bulk fetch.
pub struct CountingPointerDb<P> {
    pub inner: P,
    pub fetches: Mutex<Vec<Vec<Vec<u8>>>>,
}

impl<P> CountingPointerDb<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn fetches(&self) -> Vec<Vec<Vec<u8>>> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl<P: PointerDb> PointerDb for CountingPointerDb<P> {
    async fn list(&self, options: &ListOptions) -> PointerDbResult<ListPage> {
        self.inner.list(options).await
    }

    async fn get_all(&self, keys: &[Vec<u8>]) -> PointerDbResult<Vec<Vec<u8>>> {
        self.fetches.lock().unwrap().push(keys.to_vec());
        self.inner.get_all(keys).await
    }
}

/// Executed statement: table, rows, placeholders.
pub type Executed = (&'static str, usize, usize);

/// Metabase wrapper that records every executed statement.
pub struct RecordingMetabase {
    pub inner: MetabaseDb,
    pub statements: Mutex<Vec<Executed>>,
}

impl RecordingMetabase {
    pub async fn in_memory() -> Self {
        Self {
            inner: MetabaseDb::open_in_memory().await.unwrap(),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self, table: &str) -> Vec<(usize, usize)> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| *t == table)
            .map(|(_, rows, placeholders)| (*rows, *placeholders))
            .collect()
    }
}

#[async_trait]
impl Metabase for RecordingMetabase {
    async fn exec_insert<R: InsertRow>(
        &self,
        statement: &InsertStatement,
        rows: Vec<R>,
    ) -> DbResult<u64> {
        self.statements.lock().unwrap().push((
            statement.table(),
            statement.rows(),
            statement.placeholder_count(),
        ));
        self.inner.exec_insert(statement, rows).await
    }
}
