//! Column encoding of shard masks for the SQL backends.
//!
//! Masks are stored as 16-digit lower-case hex so that `ORDER BY shard`
//! sorts them as unsigned integers.

use tonindex_core::error::IndexerError;

pub(crate) fn encode(shard: u64) -> String {
    format!("{shard:016x}")
}

pub(crate) fn decode(column: &str) -> Result<u64, IndexerError> {
    u64::from_str_radix(column, 16)
        .map_err(|e| IndexerError::Storage(format!("bad shard column {column:?}: {e}")))
}
