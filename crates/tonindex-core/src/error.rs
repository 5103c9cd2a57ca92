//! Error types for the tonindex crawler.

use thiserror::Error;

use crate::types::{MasterchainSeqno, ShardBlockId};

/// Errors raised by ledgers, data sources and the crawler.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The masterchain seqno is already recorded in the ledger.
    ///
    /// Seeing this in a running crawler means two writers share one ledger
    /// or the resume position was computed wrongly.
    #[error("masterchain block already exists: seqno {seqno}")]
    DuplicateBlock { seqno: MasterchainSeqno },

    /// Attempt to mark a shard block processed that is not a known
    /// unprocessed record.
    #[error("shardchain block not found: {id}")]
    NotFound { id: ShardBlockId },

    /// Network failure talking to the chain data source.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// I/O failure in a ledger backend.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The data source answered, but the answer is empty or malformed.
    #[error("Invalid chain response: {0}")]
    InvalidChainResponse(String),

    #[error("Crawler aborted: {reason}")]
    Aborted { reason: String },

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` for failures expected to clear up on their own
    /// (network, storage I/O, incomplete provider data).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Rpc(_) | Self::Storage(_) | Self::InvalidChainResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(IndexerError::Rpc("timeout".into()).is_transient());
        assert!(IndexerError::InvalidChainResponse("no blocks".into()).is_transient());
        assert!(!IndexerError::DuplicateBlock { seqno: 7 }.is_transient());
        assert!(!IndexerError::NotFound {
            id: ShardBlockId::new(0, 0x8000_0000_0000_0000, 1)
        }
        .is_transient());
    }

    #[test]
    fn messages_name_the_block() {
        let err = IndexerError::DuplicateBlock { seqno: 42 };
        assert_eq!(err.to_string(), "masterchain block already exists: seqno 42");

        let err = IndexerError::NotFound {
            id: ShardBlockId::new(0, 0x8000_0000_0000_0000, 10),
        };
        assert_eq!(
            err.to_string(),
            "shardchain block not found: (0,8000000000000000,10)"
        );
    }
}
