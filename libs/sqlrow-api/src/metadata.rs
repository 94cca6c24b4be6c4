use crate::error::RowError;
use crate::key::{Key, KeyRecord};

/// Result-set metadata, as seen by a row.
///
/// Owns the key table and the secondary resolution strategy for keys the
/// table does not list (case variants, qualified/unqualified aliases, ...).
/// One instance is shared by every row of a result set, possibly across
/// threads, hence `Send + Sync`.
pub trait ResultMetadata: Send + Sync {
    /// Resolve a key absent from the primary key table.
    ///
    /// A miss must be reported as [`RowError::KeyNotFound`]. Returning an
    /// ambiguous record is allowed; the row turns it into
    /// [`RowError::AmbiguousKey`].
    fn key_fallback(&self, key: &Key) -> Result<KeyRecord, RowError>;
}

/// Metadata without any fallback: every key missing from the key table is a miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NoFallback;

impl ResultMetadata for NoFallback {
    fn key_fallback(&self, key: &Key) -> Result<KeyRecord, RowError> {
        Err(RowError::KeyNotFound(key.clone()))
    }
}
