//! Chain fetcher: validates data-source responses before the crawler
//! trusts them.
//!
//! Every shard reference that passes through here has masterchain ids
//! removed. That filter is what bounds the backward shard traversal, so it
//! lives in one place instead of at each call site.

use tonindex_core::error::IndexerError;
use tonindex_core::source::ChainDataSource;
use tonindex_core::types::{Block, MasterchainHead, MasterchainSeqno, ShardBlockId};

/// Wraps a `ChainDataSource` and turns empty or malformed answers into
/// [`IndexerError::InvalidChainResponse`].
pub struct ChainFetcher<S> {
    source: S,
}

impl<S: ChainDataSource> ChainFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Current masterchain head; rejects heads outside the masterchain and
    /// seqno 0.
    pub async fn head(&self) -> Result<MasterchainHead, IndexerError> {
        let head = self.source.get_head().await?;
        if !head.is_valid() {
            return Err(IndexerError::InvalidChainResponse(format!(
                "invalid masterchain head from provider: workchain {} seqno {}",
                head.workchain, head.seqno
            )));
        }
        Ok(head)
    }

    /// Masterchain block at `seqno`. A missing block is an error: the head
    /// already told us it exists.
    pub async fn block_at(&self, seqno: MasterchainSeqno) -> Result<Block, IndexerError> {
        self.source.get_block_at(seqno).await?.ok_or_else(|| {
            IndexerError::InvalidChainResponse(format!("no blocks returned for seqno: {seqno}"))
        })
    }

    /// Shard heads at masterchain height `seqno`, masterchain ids removed.
    pub async fn shard_heads(
        &self,
        seqno: MasterchainSeqno,
    ) -> Result<Vec<ShardBlockId>, IndexerError> {
        let heads = self.source.get_shard_heads(seqno).await?;
        Ok(without_masterchain(heads))
    }

    /// Parents of a shard block, masterchain ids removed.
    pub async fn parents(&self, id: &ShardBlockId) -> Result<Vec<ShardBlockId>, IndexerError> {
        let parents = self.source.get_shard_block_proof(id).await?;
        Ok(without_masterchain(parents))
    }
}

fn without_masterchain(mut ids: Vec<ShardBlockId>) -> Vec<ShardBlockId> {
    let before = ids.len();
    ids.retain(|id| !id.is_masterchain());
    if ids.len() != before {
        tracing::trace!(dropped = before - ids.len(), "masterchain references dropped");
    }
    ids
}
