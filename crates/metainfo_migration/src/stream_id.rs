//! Stream identifier minting.

use rand::TryRngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::error::{MigrationError, MigrationResult};

/// Mint a random (version 4) stream id from the operating system RNG.
///
/// Ids are not coordinated across processes; uniqueness relies on the
/// 122 random bits.
pub fn mint_stream_id() -> MigrationResult<Uuid> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| MigrationError::IdentifierGeneration(e.to_string()))?;
    Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
}
