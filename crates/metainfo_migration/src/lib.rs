//! Metainfo migration engine.
//!
//! Moves a bucket's legacy per-segment pointer records into the relational
//! `objects`/`segments` metabase:
//!
//! 1. [`Migrator`] pages through the bucket's terminal pointers
//! 2. [`ObjectAssembler`] rebuilds each object and fetches its remaining
//!    segments in one bulk call
//! 3. [`BatchWriter`]s buffer the resulting rows and flush them as
//!    multi-row inserts
//!
//! Every failure aborts the bucket. Batches flushed before the failure stay
//! in the destination; a rerun starts the bucket from scratch.

pub mod assemble;
pub mod batch;
pub mod config;
pub mod error;
pub mod migrator;
pub mod stream_id;

pub use assemble::{AssembledObject, ObjectAssembler};
pub use batch::{BatchWriter, DEFAULT_BATCH_SIZE, max_batch_size};
pub use config::{BucketConfig, ConfigError, MigrationConfig, load_config};
pub use error::{MigrationError, MigrationResult};
pub use migrator::{MigrationStats, Migrator};
pub use stream_id::mint_stream_id;
