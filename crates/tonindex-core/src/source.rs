//! Chain data source: where the crawler reads heads, blocks and shard links.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::{Block, MasterchainHead, MasterchainSeqno, ShardBlockId};

/// Read access to a TON node or indexer API.
///
/// `tonindex-http` provides a toncenter implementation; tests use in-process
/// mocks.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Latest masterchain block known to the provider.
    async fn get_head(&self) -> Result<MasterchainHead, IndexerError>;

    /// Masterchain block at `seqno`, or `None` if the provider has none yet.
    async fn get_block_at(&self, seqno: MasterchainSeqno) -> Result<Option<Block>, IndexerError>;

    /// Shard heads referenced by the masterchain block at `seqno`.
    async fn get_shard_heads(&self, seqno: MasterchainSeqno)
        -> Result<Vec<ShardBlockId>, IndexerError>;

    /// Parent references of a shard block, taken from its proof.
    async fn get_shard_block_proof(&self, id: &ShardBlockId)
        -> Result<Vec<ShardBlockId>, IndexerError>;
}

#[async_trait]
impl<S: ChainDataSource + ?Sized> ChainDataSource for Arc<S> {
    async fn get_head(&self) -> Result<MasterchainHead, IndexerError> {
        (**self).get_head().await
    }

    async fn get_block_at(&self, seqno: MasterchainSeqno) -> Result<Option<Block>, IndexerError> {
        (**self).get_block_at(seqno).await
    }

    async fn get_shard_heads(
        &self,
        seqno: MasterchainSeqno,
    ) -> Result<Vec<ShardBlockId>, IndexerError> {
        (**self).get_shard_heads(seqno).await
    }

    async fn get_shard_block_proof(
        &self,
        id: &ShardBlockId,
    ) -> Result<Vec<ShardBlockId>, IndexerError> {
        (**self).get_shard_block_proof(id).await
    }
}
