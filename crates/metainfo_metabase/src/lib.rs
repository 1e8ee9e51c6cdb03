//! Metabase Database Layer
//!
//! SQLite-based destination for migrated object metadata.
//!
//! # Architecture
//!
//! - **objects** - one row per committed object, keyed by project, bucket,
//!   object key and version
//! - **segments** - one row per segment, grouped by the object's stream id
//!   and ordered by encoded segment position
//! - **Batched inserts** - rows are written through multi-row statements
//!   built by [`statement::insert_statement`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use metainfo_metabase::MetabaseDb;
//!
//! let db = MetabaseDb::open("path/to/metabase.db").await?;
//! db.ensure_schema().await?;
//! ```

pub mod connection;
pub mod error;
pub mod exec;
pub mod models;
pub mod queries;
pub mod statement;

pub use connection::{MetabaseDb, MetabaseStats};
pub use error::{DbError, DbResult};
pub use exec::Metabase;
pub use models::{NodeAliases, ObjectRow, ObjectStatus, SegmentPosition, SegmentRow};
pub use statement::{InsertRow, InsertStatement, MAX_PLACEHOLDERS, insert_statement};
