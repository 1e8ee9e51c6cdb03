//! Legacy pointer store access.
//!
//! The legacy metainfo layout keeps one protobuf-encoded [`Pointer`] per
//! segment in a flat, ordered key-value store. Keys follow the
//! `{project}/{segment}/{bucket}/{encrypted_path}` layout described in
//! [`path`]; the terminal segment of each object lives under the `l`
//! segment and carries the whole-object [`StreamMeta`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use metainfo_pointerdb::{ListCursor, ListOptions, SledPointerDb, path};
//!
//! let db = SledPointerDb::open("path/to/pointerdb")?;
//! let prefix = path::bucket_prefix(&project_id, b"photos");
//! let mut cursor = ListCursor::new(ListOptions::recursive(prefix));
//! while let Some(page) = cursor.next_page(&db).await? {
//!     // ...
//! }
//! ```

pub mod decode;
pub mod error;
pub mod path;
pub mod pb;
pub mod sled_store;
pub mod store;

pub use decode::{decode_pointer, decode_stream_meta, timestamp_to_datetime, zero_time};
pub use error::{PointerDbError, PointerDbResult};
pub use path::{SegmentIndex, SegmentKey};
pub use pb::{Pointer, RemoteSegment, SegmentMeta, StreamMeta};
pub use sled_store::SledPointerDb;
pub use store::{
    DEFAULT_LIST_LIMIT, ListCursor, ListItem, ListOptions, ListPage, PATH_SEPARATOR, PointerDb,
    list_buckets,
};
