//! Reconstruction of multi-segment objects from per-segment pointers.

use metainfo_metabase::{NodeAliases, ObjectRow, ObjectStatus, SegmentPosition, SegmentRow};
use metainfo_pointerdb::{
    Pointer, PointerDb, SegmentIndex, SegmentKey, SegmentMeta, decode_pointer,
};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{MigrationError, MigrationResult};
use crate::stream_id::mint_stream_id;

/// One legacy object rebuilt as destination rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledObject {
    pub object: ObjectRow,
    /// Terminal segment first, then segments `0..N-1` in index order.
    pub segments: Vec<SegmentRow>,
}

/// Rebuilds objects of one bucket from their terminal pointers.
pub struct ObjectAssembler<'a, P: ?Sized> {
    pointerdb: &'a P,
    project_id: Uuid,
    bucket: &'a [u8],
}

impl<'a, P> ObjectAssembler<'a, P>
where
    P: PointerDb + ?Sized,
{
    pub fn new(pointerdb: &'a P, project_id: Uuid, bucket: &'a [u8]) -> Self {
        Self {
            pointerdb,
            project_id,
            bucket,
        }
    }

    /// Assemble the object whose terminal pointer was listed under
    /// `encrypted_path`.
    ///
    /// The non-terminal segments are fetched with a single bulk call.
    /// Segments missing from the store are not detected here: the store
    /// either fails the fetch or returns fewer values.
    pub async fn assemble(
        &self,
        encrypted_path: &[u8],
        pointer: &Pointer,
    ) -> MigrationResult<AssembledObject> {
        let stream_meta = pointer
            .stream_meta()
            .map_err(|source| MigrationError::decode("stream metadata", encrypted_path, source))?;

        let segment_count = match stream_meta.number_of_segments {
            0 => {
                return Err(MigrationError::UnsupportedCase {
                    key: String::from_utf8_lossy(encrypted_path).into_owned(),
                });
            }
            n => i32::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    MigrationError::invalid_record(
                        encrypted_path,
                        format!("segment count {} out of range", n),
                    )
                })?,
        };

        let created_at = pointer.created_at().ok_or_else(|| {
            MigrationError::invalid_record(encrypted_path, "creation date out of range")
        })?;

        let stream_id = mint_stream_id()?;
        trace!(%stream_id, segment_count, "Assembling object");

        let object = ObjectRow {
            project_id: self.project_id,
            bucket_name: self.bucket.to_vec(),
            object_key: encrypted_path.to_vec(),
            version: ObjectRow::DEFAULT_VERSION,
            stream_id,
            created_at,
            expires_at: pointer.expires_at(),
            status: ObjectStatus::Committed,
            segment_count,
            encrypted_metadata_nonce: pointer.metadata.clone(),
        };

        // positive i32, so the index range fits in u32
        let last_index = segment_count as u32 - 1;
        let mut segments = Vec::with_capacity(segment_count as usize);
        segments.push(segment_row(
            stream_id,
            last_index,
            pointer,
            stream_meta.last_segment_meta.as_ref(),
            encrypted_path,
        )?);

        if last_index > 0 {
            let keys: Vec<Vec<u8>> = (0..last_index)
                .map(|index| {
                    SegmentKey::new(
                        self.project_id,
                        SegmentIndex::Index(index),
                        self.bucket,
                        encrypted_path,
                    )
                    .encode()
                })
                .collect();

            debug!(%stream_id, keys = keys.len(), "Fetching remaining segments");
            let values = self.pointerdb.get_all(&keys).await?;

            for (index, value) in (0..last_index).zip(values) {
                let segment = decode_pointer(&value).map_err(|source| {
                    MigrationError::decode("segment pointer", &keys[index as usize], source)
                })?;
                segments.push(segment_row(stream_id, index, &segment, None, encrypted_path)?);
            }
        }

        Ok(AssembledObject { object, segments })
    }
}

fn segment_row(
    stream_id: Uuid,
    index: u32,
    pointer: &Pointer,
    encryption: Option<&SegmentMeta>,
    encrypted_path: &[u8],
) -> MigrationResult<SegmentRow> {
    let encrypted_data_size = i32::try_from(pointer.segment_size).map_err(|_| {
        MigrationError::invalid_record(
            encrypted_path,
            format!("segment {} size {} out of range", index, pointer.segment_size),
        )
    })?;

    let (encrypted_key, encrypted_key_nonce) = encryption
        .map(|meta| (meta.encrypted_key.clone(), meta.key_nonce.clone()))
        .unwrap_or_default();

    Ok(SegmentRow {
        stream_id,
        segment_position: SegmentPosition::new(index).encode(),
        root_piece_id: pointer.root_piece_id().to_vec(),
        encrypted_key,
        encrypted_key_nonce,
        encrypted_data_size,
        // not tracked by legacy pointers
        unencrypted_data_size: 0,
        inline_data: pointer.inline_segment.clone(),
        node_aliases: NodeAliases::placeholder().encode(),
    })
}
