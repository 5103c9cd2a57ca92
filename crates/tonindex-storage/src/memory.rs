//! In-memory block ledger.
//!
//! Keeps the masterchain set and the shard frontier in RAM. Useful for
//! tests and for crawlers that are happy to start from the head again after
//! a restart. Process-local: two crawlers never share one of these.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use tonindex_core::error::IndexerError;
use tonindex_core::ledger::{BlockLedger, LedgerStats};
use tonindex_core::types::{MasterchainSeqno, ShardBlockId};

#[derive(Default)]
struct Inner {
    masterchain: BTreeSet<MasterchainSeqno>,
    /// Every known shard block → processed flag.
    shards: HashMap<ShardBlockId, bool>,
    /// Unprocessed subset of `shards`, ordered by `(seqno, workchain, shard)`.
    frontier: BTreeSet<ShardBlockId>,
}

impl Inner {
    fn discover(&mut self, ids: &[ShardBlockId]) {
        for id in ids {
            if id.is_masterchain() || self.shards.contains_key(id) {
                continue;
            }
            self.shards.insert(*id, false);
            self.frontier.insert(*id);
        }
    }
}

/// In-memory ledger.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, IndexerError> {
        self.inner
            .lock()
            .map_err(|_| IndexerError::Storage("memory ledger lock poisoned".into()))
    }
}

#[async_trait]
impl BlockLedger for MemoryLedger {
    async fn insert_masterchain_block(&self, seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        if !self.lock()?.masterchain.insert(seqno) {
            return Err(IndexerError::DuplicateBlock { seqno });
        }
        Ok(())
    }

    async fn get_last_masterchain_block(&self) -> Result<Option<MasterchainSeqno>, IndexerError> {
        Ok(self.lock()?.masterchain.last().copied())
    }

    async fn insert_shardchain_blocks(&self, ids: &[ShardBlockId]) -> Result<(), IndexerError> {
        self.lock()?.discover(ids);
        Ok(())
    }

    async fn get_unprocessed_shardchain_block(
        &self,
    ) -> Result<Option<ShardBlockId>, IndexerError> {
        Ok(self.lock()?.frontier.first().copied())
    }

    async fn set_shardchain_block_processed(
        &self,
        id: &ShardBlockId,
        parents: &[ShardBlockId],
    ) -> Result<(), IndexerError> {
        let mut inner = self.lock()?;
        match inner.shards.get_mut(id) {
            Some(processed) if !*processed => *processed = true,
            _ => return Err(IndexerError::NotFound { id: *id }),
        }
        inner.frontier.remove(id);
        inner.discover(parents);
        Ok(())
    }

    async fn clean(&self) -> Result<(), IndexerError> {
        *self.lock()? = Inner::default();
        Ok(())
    }

    async fn stats(&self) -> Result<LedgerStats, IndexerError> {
        let inner = self.lock()?;
        Ok(LedgerStats {
            masterchain_blocks: inner.masterchain.len() as u64,
            last_masterchain_block: inner.masterchain.last().copied(),
            shard_blocks: inner.shards.len() as u64,
            unprocessed_shard_blocks: inner.frontier.len() as u64,
        })
    }
}
