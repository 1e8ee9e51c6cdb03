//! Legacy protobuf record definitions.
//!
//! Only the fields the migration reads are declared; unknown fields are
//! skipped by the decoder.

use prost_types::Timestamp;

/// Per-segment metadata record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pointer {
    #[prost(enumeration = "pointer::DataType", tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub inline_segment: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub remote: Option<RemoteSegment>,
    #[prost(int64, tag = "5")]
    pub segment_size: i64,
    #[prost(message, optional, tag = "6")]
    pub creation_date: Option<Timestamp>,
    #[prost(message, optional, tag = "7")]
    pub expiration_date: Option<Timestamp>,
    /// Stream metadata on the terminal segment.
    #[prost(bytes = "vec", tag = "8")]
    pub metadata: Vec<u8>,
}

pub mod pointer {
    /// Where the segment data lives.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum DataType {
        Inline = 0,
        Remote = 1,
    }
}

/// Remote segment description. Piece placement is not needed for the
/// migration, only the root piece id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoteSegment {
    #[prost(bytes = "vec", tag = "2")]
    pub root_piece_id: Vec<u8>,
}

/// Whole-object metadata stored in the terminal pointer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamMeta {
    #[prost(int64, tag = "1")]
    pub number_of_segments: i64,
    #[prost(bytes = "vec", tag = "2")]
    pub encrypted_stream_info: Vec<u8>,
    #[prost(int32, tag = "3")]
    pub encryption_type: i32,
    #[prost(int32, tag = "4")]
    pub encryption_block_size: i32,
    #[prost(message, optional, tag = "5")]
    pub last_segment_meta: Option<SegmentMeta>,
}

/// Encryption info of a single segment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SegmentMeta {
    #[prost(bytes = "vec", tag = "1")]
    pub encrypted_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub key_nonce: Vec<u8>,
}
