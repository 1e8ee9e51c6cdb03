//! Legacy key layout.
//!
//! Every segment is stored under `{project_id}/{segment}/{bucket}/{encrypted_path}`,
//! where `segment` is `l` for the terminal segment of an object and `s{index}`
//! for every other segment.

use std::fmt;

use uuid::Uuid;

use crate::store::PATH_SEPARATOR;

/// Segment component of a legacy key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentIndex {
    /// The terminal segment, carrying the stream metadata.
    Last,
    /// An explicitly indexed, non-terminal segment.
    Index(u32),
}

impl fmt::Display for SegmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentIndex::Last => f.write_str("l"),
            SegmentIndex::Index(index) => write!(f, "s{}", index),
        }
    }
}

/// Full key of one legacy segment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentKey<'a> {
    pub project_id: Uuid,
    pub index: SegmentIndex,
    pub bucket: &'a [u8],
    pub encrypted_path: &'a [u8],
}

impl<'a> SegmentKey<'a> {
    pub fn new(
        project_id: Uuid,
        index: SegmentIndex,
        bucket: &'a [u8],
        encrypted_path: &'a [u8],
    ) -> Self {
        Self {
            project_id,
            index,
            bucket,
            encrypted_path,
        }
    }

    /// Encode the key as stored. Empty bucket or path components are omitted.
    pub fn encode(&self) -> Vec<u8> {
        let mut key = segment_prefix(&self.project_id, self.index);
        for part in [self.bucket, self.encrypted_path] {
            if !part.is_empty() {
                key.push(PATH_SEPARATOR);
                key.extend_from_slice(part);
            }
        }
        key
    }
}

fn segment_prefix(project_id: &Uuid, index: SegmentIndex) -> Vec<u8> {
    format!("{}/{}", project_id, index).into_bytes()
}

/// Listing prefix of all terminal segments of a project. Non-recursive
/// listing under it yields one `{bucket}/` prefix item per bucket.
pub fn project_prefix(project_id: &Uuid) -> Vec<u8> {
    let mut prefix = segment_prefix(project_id, SegmentIndex::Last);
    prefix.push(PATH_SEPARATOR);
    prefix
}

/// Listing prefix of all terminal segments of one bucket.
pub fn bucket_prefix(project_id: &Uuid, bucket: &[u8]) -> Vec<u8> {
    let mut prefix = project_prefix(project_id);
    prefix.extend_from_slice(bucket);
    prefix.push(PATH_SEPARATOR);
    prefix
}
