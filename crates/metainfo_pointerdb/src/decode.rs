//! Decoding of legacy pointer records.

use chrono::{DateTime, Utc};
use prost::Message;
use prost_types::Timestamp;

use crate::pb::{Pointer, StreamMeta};

/// Decode a pointer blob as stored in the legacy key-value store.
pub fn decode_pointer(bytes: &[u8]) -> Result<Pointer, prost::DecodeError> {
    Pointer::decode(bytes)
}

/// Decode the stream metadata embedded in a terminal pointer.
pub fn decode_stream_meta(bytes: &[u8]) -> Result<StreamMeta, prost::DecodeError> {
    StreamMeta::decode(bytes)
}

impl Pointer {
    /// Decode this pointer's metadata blob as [`StreamMeta`].
    pub fn stream_meta(&self) -> Result<StreamMeta, prost::DecodeError> {
        decode_stream_meta(&self.metadata)
    }

    /// Root piece id of the remote segment, empty for inline segments.
    pub fn root_piece_id(&self) -> &[u8] {
        self.remote
            .as_ref()
            .map(|remote| remote.root_piece_id.as_slice())
            .unwrap_or_default()
    }

    /// Creation time. Pointers written without one report [`zero_time`];
    /// `None` only for an out-of-range timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match &self.creation_date {
            Some(ts) => timestamp_to_datetime(ts),
            None => Some(zero_time()),
        }
    }

    /// Expiration time; a zero timestamp means the object never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
            .as_ref()
            .filter(|ts| ts.seconds != 0 || ts.nanos != 0)
            .and_then(timestamp_to_datetime)
    }
}

/// Seconds from the Unix epoch back to 0001-01-01T00:00:00Z.
const ZERO_TIME_SECONDS: i64 = -62_135_596_800;

/// Timestamp recorded for pointers that carry no creation date.
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_SECONDS, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert a protobuf timestamp, rejecting out-of-range values.
pub fn timestamp_to_datetime(ts: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pb::{RemoteSegment, SegmentMeta, pointer::DataType};
    use pretty_assertions::assert_eq;

    fn terminal_pointer() -> Pointer {
        let meta = StreamMeta {
            number_of_segments: 3,
            last_segment_meta: Some(SegmentMeta {
                encrypted_key: b"key".to_vec(),
                key_nonce: b"nonce".to_vec(),
            }),
            ..Default::default()
        };
        Pointer {
            r#type: DataType::Remote as i32,
            remote: Some(RemoteSegment {
                root_piece_id: vec![7; 32],
            }),
            segment_size: 1024,
            creation_date: Some(Timestamp {
                seconds: 1_600_000_000,
                nanos: 0,
            }),
            metadata: meta.encode_to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_pointer_with_stream_meta() {
        let pointer = terminal_pointer();
        let decoded = decode_pointer(&pointer.encode_to_vec()).unwrap();
        assert_eq!(decoded, pointer);
        assert_eq!(decoded.r#type(), DataType::Remote);
        assert_eq!(decoded.root_piece_id(), &[7; 32][..]);

        let meta = decoded.stream_meta().unwrap();
        assert_eq!(meta.number_of_segments, 3);
        let last = meta.last_segment_meta.unwrap();
        assert_eq!(last.encrypted_key, b"key");
        assert_eq!(last.key_nonce, b"nonce");
    }

    #[test]
    fn test_decode_truncated_pointer_fails() {
        let bytes = terminal_pointer().encode_to_vec();
        assert!(decode_pointer(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_decode_malformed_stream_meta_fails() {
        let pointer = Pointer {
            // length-delimited field 2 claiming more bytes than present
            metadata: vec![0x12, 0x05, 0x01],
            ..Default::default()
        };
        assert!(pointer.stream_meta().is_err());
    }

    #[test]
    fn test_inline_pointer_has_empty_root_piece_id() {
        let pointer = Pointer {
            inline_segment: b"hello".to_vec(),
            ..Default::default()
        };
        assert!(pointer.root_piece_id().is_empty());
    }

    #[test]
    fn test_timestamps() {
        let mut pointer = terminal_pointer();
        assert_eq!(
            pointer.created_at().unwrap().timestamp(),
            1_600_000_000
        );
        assert_eq!(pointer.expires_at(), None);

        pointer.expiration_date = Some(Timestamp::default());
        assert_eq!(pointer.expires_at(), None);

        pointer.expiration_date = Some(Timestamp {
            seconds: 1_700_000_000,
            nanos: 500,
        });
        let expires = pointer.expires_at().unwrap();
        assert_eq!(expires.timestamp(), 1_700_000_000);
        assert_eq!(expires.timestamp_subsec_nanos(), 500);

        assert_eq!(
            timestamp_to_datetime(&Timestamp {
                seconds: 0,
                nanos: -1
            }),
            None
        );
    }

    #[test]
    fn test_missing_creation_date_is_zero_time() {
        let mut pointer = terminal_pointer();
        pointer.creation_date = None;
        let created = pointer.created_at().unwrap();
        assert_eq!(created, zero_time());
        assert_eq!(created.timestamp(), ZERO_TIME_SECONDS);
        assert_eq!(created.to_rfc3339(), "0001-01-01T00:00:00+00:00");
    }
}
