//! Block ledger: the persisted record of which blocks are known and
//! whether each has been processed.
//!
//! The ledger is what makes the crawler restartable: the masterchain side
//! answers "where do I resume", the shardchain side holds the frontier of
//! discovered-but-unexpanded shard blocks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::{MasterchainSeqno, ShardBlockId};

/// Snapshot of ledger contents, for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub masterchain_blocks: u64,
    pub last_masterchain_block: Option<MasterchainSeqno>,
    pub shard_blocks: u64,
    pub unprocessed_shard_blocks: u64,
}

/// Storage contract for crawl progress.
///
/// Implementations include `MemoryLedger`, `SqliteLedger` and
/// `PostgresLedger` in `tonindex-storage`.
#[async_trait]
pub trait BlockLedger: Send + Sync {
    /// Record a masterchain block.
    ///
    /// Fails with [`IndexerError::DuplicateBlock`] if `seqno` is already
    /// present. Shared-store backends must implement this as an atomic
    /// insert-if-absent.
    async fn insert_masterchain_block(&self, seqno: MasterchainSeqno) -> Result<(), IndexerError>;

    /// Highest recorded masterchain seqno (a max, not the last inserted).
    async fn get_last_masterchain_block(&self) -> Result<Option<MasterchainSeqno>, IndexerError>;

    /// Insert unknown ids as unprocessed. Known ids are left untouched.
    async fn insert_shardchain_blocks(&self, ids: &[ShardBlockId]) -> Result<(), IndexerError>;

    /// Lowest unprocessed shard block by `(seqno, workchain, shard)`.
    async fn get_unprocessed_shardchain_block(&self)
        -> Result<Option<ShardBlockId>, IndexerError>;

    /// Mark `id` processed and enqueue its parents.
    ///
    /// Fails with [`IndexerError::NotFound`] unless `id` is a known
    /// unprocessed record. Masterchain parents must already be filtered out
    /// by the caller.
    async fn set_shardchain_block_processed(
        &self,
        id: &ShardBlockId,
        parents: &[ShardBlockId],
    ) -> Result<(), IndexerError>;

    /// Remove every masterchain and shardchain record.
    async fn clean(&self) -> Result<(), IndexerError>;

    /// Record counts for status output.
    async fn stats(&self) -> Result<LedgerStats, IndexerError>;
}

#[async_trait]
impl<L: BlockLedger + ?Sized> BlockLedger for Arc<L> {
    async fn insert_masterchain_block(&self, seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        (**self).insert_masterchain_block(seqno).await
    }

    async fn get_last_masterchain_block(&self) -> Result<Option<MasterchainSeqno>, IndexerError> {
        (**self).get_last_masterchain_block().await
    }

    async fn insert_shardchain_blocks(&self, ids: &[ShardBlockId]) -> Result<(), IndexerError> {
        (**self).insert_shardchain_blocks(ids).await
    }

    async fn get_unprocessed_shardchain_block(
        &self,
    ) -> Result<Option<ShardBlockId>, IndexerError> {
        (**self).get_unprocessed_shardchain_block().await
    }

    async fn set_shardchain_block_processed(
        &self,
        id: &ShardBlockId,
        parents: &[ShardBlockId],
    ) -> Result<(), IndexerError> {
        (**self).set_shardchain_block_processed(id, parents).await
    }

    async fn clean(&self) -> Result<(), IndexerError> {
        (**self).clean().await
    }

    async fn stats(&self) -> Result<LedgerStats, IndexerError> {
        (**self).stats().await
    }
}

#[async_trait]
impl<L: BlockLedger + ?Sized> BlockLedger for Box<L> {
    async fn insert_masterchain_block(&self, seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        (**self).insert_masterchain_block(seqno).await
    }

    async fn get_last_masterchain_block(&self) -> Result<Option<MasterchainSeqno>, IndexerError> {
        (**self).get_last_masterchain_block().await
    }

    async fn insert_shardchain_blocks(&self, ids: &[ShardBlockId]) -> Result<(), IndexerError> {
        (**self).insert_shardchain_blocks(ids).await
    }

    async fn get_unprocessed_shardchain_block(
        &self,
    ) -> Result<Option<ShardBlockId>, IndexerError> {
        (**self).get_unprocessed_shardchain_block().await
    }

    async fn set_shardchain_block_processed(
        &self,
        id: &ShardBlockId,
        parents: &[ShardBlockId],
    ) -> Result<(), IndexerError> {
        (**self).set_shardchain_block_processed(id, parents).await
    }

    async fn clean(&self) -> Result<(), IndexerError> {
        (**self).clean().await
    }

    async fn stats(&self) -> Result<LedgerStats, IndexerError> {
        (**self).stats().await
    }
}
