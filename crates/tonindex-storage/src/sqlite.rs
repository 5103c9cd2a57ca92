//! SQLite block ledger.
//!
//! Persists masterchain and shardchain records to a single SQLite file.
//! Masterchain inserts use `INSERT OR IGNORE` plus a rows-affected check, so
//! two processes pointed at the same file can never both record a seqno.
//!
//! # Usage
//! ```rust,no_run
//! use tonindex_storage::sqlite::SqliteLedger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let ledger = SqliteLedger::open("./tonindex.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let ledger = SqliteLedger::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use tonindex_core::error::IndexerError;
use tonindex_core::ledger::{BlockLedger, LedgerStats};
use tonindex_core::types::{MasterchainSeqno, ShardBlockId};

use crate::shard_key;

fn storage_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

/// SQLite-backed block ledger.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./tonindex.db"`) or a full
    /// SQLite URL (`"sqlite:./tonindex.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;

        let ledger = Self { pool };
        ledger.init_schema(true).await?;
        Ok(ledger)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Pinned to a single long-lived connection, since every new SQLite
    /// connection to `:memory:` would see an empty database.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let ledger = Self { pool };
        ledger.init_schema(false).await?;
        Ok(ledger)
    }

    /// Create tables; enable WAL for file databases.
    async fn init_schema(&self, wal: bool) -> Result<(), IndexerError> {
        if wal {
            sqlx::query("PRAGMA journal_mode=WAL;")
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS masterchain_blocks (
                seqno INTEGER PRIMARY KEY
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS shardchain_blocks (
                workchain INTEGER NOT NULL,
                shard     TEXT    NOT NULL,
                seqno     INTEGER NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (workchain, shard, seqno)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        // Frontier scan: lowest unprocessed (seqno, workchain, shard)
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_shardchain_frontier
             ON shardchain_blocks (processed, seqno, workchain, shard);",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn count(&self, sql: &str) -> Result<u64, IndexerError> {
        let row = sqlx::query(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.get::<i64, _>("cnt") as u64)
    }
}

fn shard_id_from_row(row: &SqliteRow) -> Result<ShardBlockId, IndexerError> {
    let shard: String = row.get("shard");
    Ok(ShardBlockId {
        workchain: row.get::<i64, _>("workchain") as i32,
        shard: shard_key::decode(&shard)?,
        seqno: row.get::<i64, _>("seqno") as u32,
    })
}

/// Insert-or-ignore shard ids inside an open transaction.
async fn insert_shard_ids(
    conn: &mut sqlx::SqliteConnection,
    ids: &[ShardBlockId],
) -> Result<(), IndexerError> {
    for id in ids.iter().filter(|id| !id.is_masterchain()) {
        sqlx::query(
            "INSERT OR IGNORE INTO shardchain_blocks (workchain, shard, seqno, processed)
             VALUES (?, ?, ?, 0)",
        )
        .bind(id.workchain as i64)
        .bind(shard_key::encode(id.shard))
        .bind(id.seqno as i64)
        .execute(&mut *conn)
        .await
        .map_err(storage_err)?;
    }
    Ok(())
}

#[async_trait]
impl BlockLedger for SqliteLedger {
    async fn insert_masterchain_block(&self, seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        let result = sqlx::query("INSERT OR IGNORE INTO masterchain_blocks (seqno) VALUES (?)")
            .bind(seqno as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(IndexerError::DuplicateBlock { seqno });
        }
        debug!(seqno, "masterchain block recorded");
        Ok(())
    }

    async fn get_last_masterchain_block(&self) -> Result<Option<MasterchainSeqno>, IndexerError> {
        let row = sqlx::query("SELECT MAX(seqno) AS last FROM masterchain_blocks")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.get::<Option<i64>, _>("last").map(|s| s as MasterchainSeqno))
    }

    async fn insert_shardchain_blocks(&self, ids: &[ShardBlockId]) -> Result<(), IndexerError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        insert_shard_ids(&mut *tx, ids).await?;
        tx.commit().await.map_err(storage_err)
    }

    async fn get_unprocessed_shardchain_block(
        &self,
    ) -> Result<Option<ShardBlockId>, IndexerError> {
        let row = sqlx::query(
            "SELECT workchain, shard, seqno FROM shardchain_blocks
             WHERE processed = 0
             ORDER BY seqno, workchain, shard
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(shard_id_from_row).transpose()
    }

    async fn set_shardchain_block_processed(
        &self,
        id: &ShardBlockId,
        parents: &[ShardBlockId],
    ) -> Result<(), IndexerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let result = sqlx::query(
            "UPDATE shardchain_blocks SET processed = 1
             WHERE workchain = ? AND shard = ? AND seqno = ? AND processed = 0",
        )
        .bind(id.workchain as i64)
        .bind(shard_key::encode(id.shard))
        .bind(id.seqno as i64)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            // Dropping `tx` rolls back.
            return Err(IndexerError::NotFound { id: *id });
        }

        insert_shard_ids(&mut *tx, parents).await?;
        tx.commit().await.map_err(storage_err)?;

        debug!(%id, parents = parents.len(), "shardchain block processed");
        Ok(())
    }

    async fn clean(&self) -> Result<(), IndexerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        sqlx::query("DELETE FROM masterchain_blocks")
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        sqlx::query("DELETE FROM shardchain_blocks")
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        tx.commit().await.map_err(storage_err)?;

        debug!("ledger cleaned");
        Ok(())
    }

    async fn stats(&self) -> Result<LedgerStats, IndexerError> {
        Ok(LedgerStats {
            masterchain_blocks: self
                .count("SELECT COUNT(*) AS cnt FROM masterchain_blocks")
                .await?,
            last_masterchain_block: self.get_last_masterchain_block().await?,
            shard_blocks: self
                .count("SELECT COUNT(*) AS cnt FROM shardchain_blocks")
                .await?,
            unprocessed_shard_blocks: self
                .count("SELECT COUNT(*) AS cnt FROM shardchain_blocks WHERE processed = 0")
                .await?,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract;

    async fn ledger() -> SqliteLedger {
        SqliteLedger::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_masterchain_insert_fails() {
        contract::duplicate_masterchain_insert_fails(&ledger().await).await;
    }

    #[tokio::test]
    async fn last_masterchain_block_is_max() {
        contract::last_masterchain_block_is_max(&ledger().await).await;
    }

    #[tokio::test]
    async fn shard_insert_is_idempotent() {
        contract::shard_insert_is_idempotent(&ledger().await).await;
    }

    #[tokio::test]
    async fn frontier_returns_global_minimum() {
        contract::frontier_returns_global_minimum(&ledger().await).await;
    }

    #[tokio::test]
    async fn processing_enqueues_parents() {
        contract::processing_enqueues_parents(&ledger().await).await;
    }

    #[tokio::test]
    async fn processing_unknown_or_processed_fails() {
        contract::processing_unknown_or_processed_fails(&ledger().await).await;
    }

    #[tokio::test]
    async fn masterchain_ids_never_enter_frontier() {
        contract::masterchain_ids_never_enter_frontier(&ledger().await).await;
    }

    #[tokio::test]
    async fn clean_empties_everything() {
        contract::clean_empties_everything(&ledger().await).await;
    }

    #[tokio::test]
    async fn frontier_orders_shards_numerically() {
        // 0x0800… sorts before 0xe000… only if the mask column is zero-padded.
        let store = ledger().await;
        let high = ShardBlockId::new(0, 0xe000_0000_0000_0000, 4);
        let low = ShardBlockId::new(0, 0x0800_0000_0000_0000, 4);
        store.insert_shardchain_blocks(&[high, low]).await.unwrap();
        assert_eq!(store.get_unprocessed_shardchain_block().await.unwrap(), Some(low));
    }

    #[tokio::test]
    async fn progress_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "tonindex-ledger-{}-{}.db",
            std::process::id(),
            line!()
        ));
        let path = path.to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        {
            let store = SqliteLedger::open(&path).await.unwrap();
            store.insert_masterchain_block(41).await.unwrap();
            store.insert_masterchain_block(42).await.unwrap();
            store
                .insert_shardchain_blocks(&[ShardBlockId::new(0, 1 << 63, 7)])
                .await
                .unwrap();
            store.pool.close().await;
        }

        let store = SqliteLedger::open(&path).await.unwrap();
        assert_eq!(store.get_last_masterchain_block().await.unwrap(), Some(42));
        assert!(matches!(
            store.insert_masterchain_block(42).await,
            Err(IndexerError::DuplicateBlock { seqno: 42 })
        ));
        assert_eq!(
            store.get_unprocessed_shardchain_block().await.unwrap(),
            Some(ShardBlockId::new(0, 1 << 63, 7))
        );
        store.pool.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
