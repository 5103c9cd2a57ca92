//! tonindex-storage — block ledger backends for tonindex.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - `sqlite`: SQLite via `sqlx` (single-file persistence)
//! - `postgres`: PostgreSQL via `sqlx` (shared by cooperating crawlers)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod shard_key;

#[cfg(test)]
mod contract;

pub use memory::MemoryLedger;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedger;

#[cfg(feature = "postgres")]
pub use postgres::PostgresLedger;
