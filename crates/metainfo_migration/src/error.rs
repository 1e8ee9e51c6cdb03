use metainfo_metabase::DbError;
use metainfo_pointerdb::PointerDbError;
use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;

pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors that abort a bucket migration. None of them are retried.
#[derive(Error, Diagnostic, Debug)]
pub enum MigrationError {
    #[error("Failed to decode {record} of {key}")]
    #[diagnostic(
        code(metainfo_migration::decode),
        help("The legacy record is malformed or truncated; the bucket cannot be migrated as-is")
    )]
    Decode {
        record: &'static str,
        key: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Invalid record {key}: {message}")]
    #[diagnostic(code(metainfo_migration::invalid_record))]
    InvalidRecord { key: String, message: String },

    #[error("Unsupported case: object {key} has no segments")]
    #[diagnostic(
        code(metainfo_migration::unsupported_case),
        help("Zero-segment legacy objects are not migrated")
    )]
    UnsupportedCase { key: String },

    #[error("Pointer store failure")]
    #[diagnostic(code(metainfo_migration::store))]
    Store(#[from] PointerDbError),

    #[error("Metabase insert failed")]
    #[diagnostic(code(metainfo_migration::exec))]
    Exec(#[from] DbError),

    #[error("Failed to generate stream id: {0}")]
    #[diagnostic(code(metainfo_migration::stream_id))]
    IdentifierGeneration(String),

    #[error("Migration of bucket {bucket} exceeded its {seconds}s deadline")]
    #[diagnostic(
        code(metainfo_migration::timeout),
        help("Batches flushed so far remain in the metabase; rerun the bucket from scratch")
    )]
    Timeout { bucket: String, seconds: u64 },

    #[error("Configuration error in {config_path}")]
    #[diagnostic(code(metainfo_migration::config))]
    Config {
        config_path: String,
        #[source]
        cause: ConfigError,
    },
}

impl MigrationError {
    pub(crate) fn decode(record: &'static str, key: &[u8], source: prost::DecodeError) -> Self {
        Self::Decode {
            record,
            key: String::from_utf8_lossy(key).into_owned(),
            source,
        }
    }

    pub(crate) fn invalid_record(key: &[u8], message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            key: String::from_utf8_lossy(key).into_owned(),
            message: message.into(),
        }
    }
}
