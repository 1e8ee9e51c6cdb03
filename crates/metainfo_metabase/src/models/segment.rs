//! Segment models and the encodings stored alongside them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::statement::{InsertRow, SqliteQuery};

/// Location of a segment within its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentPosition {
    pub part: u32,
    pub index: u32,
}

impl SegmentPosition {
    /// Position of segment `index` in the single part of a legacy object.
    pub fn new(index: u32) -> Self {
        Self { part: 0, index }
    }

    /// Pack as `part << 32 | index`.
    pub fn encode(self) -> i64 {
        ((u64::from(self.part) << 32) | u64::from(self.index)) as i64
    }

    pub fn decode(encoded: i64) -> Self {
        let encoded = encoded as u64;
        Self {
            part: (encoded >> 32) as u32,
            index: encoded as u32,
        }
    }
}

/// Node alias list of a remote segment's pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAliases(pub Vec<u32>);

impl NodeAliases {
    /// Placeholder aliases written for migrated segments until piece
    /// placement is resolved against the node alias table.
    pub fn placeholder() -> Self {
        Self(vec![1])
    }

    /// Encode as consecutive unsigned LEB128 varints.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len());
        for &alias in &self.0 {
            let mut value = alias;
            loop {
                let byte = (value & 0x7f) as u8;
                value >>= 7;
                if value == 0 {
                    out.push(byte);
                    break;
                }
                out.push(byte | 0x80);
            }
        }
        out
    }
}

/// One row of the `segments` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SegmentRow {
    pub stream_id: Uuid,
    /// Encoded [`SegmentPosition`].
    pub segment_position: i64,
    /// Empty for inline segments.
    pub root_piece_id: Vec<u8>,

    // only the terminal segment carries these
    pub encrypted_key: Vec<u8>,
    pub encrypted_key_nonce: Vec<u8>,

    pub encrypted_data_size: i32,
    pub unencrypted_data_size: i32,
    pub inline_data: Vec<u8>,

    pub node_aliases: Vec<u8>,
}

impl SegmentRow {
    pub fn position(&self) -> SegmentPosition {
        SegmentPosition::decode(self.segment_position)
    }

    pub fn has_encryption_key(&self) -> bool {
        !self.encrypted_key.is_empty() || !self.encrypted_key_nonce.is_empty()
    }
}

impl InsertRow for SegmentRow {
    const TABLE: &'static str = "segments";
    const COLUMNS: &'static [&'static str] = &[
        "stream_id",
        "segment_position",
        "root_piece_id",
        "encrypted_key",
        "encrypted_key_nonce",
        "encrypted_data_size",
        "unencrypted_data_size",
        "inline_data",
        "node_aliases",
    ];

    fn bind<'q>(self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.stream_id)
            .bind(self.segment_position)
            .bind(self.root_piece_id)
            .bind(self.encrypted_key)
            .bind(self.encrypted_key_nonce)
            .bind(self.encrypted_data_size)
            .bind(self.unencrypted_data_size)
            .bind(self.inline_data)
            .bind(self.node_aliases)
    }
}
