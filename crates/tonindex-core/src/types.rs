//! Block identifiers and payloads shared across the crawler.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Height of a masterchain block.
pub type MasterchainSeqno = u32;

/// Workchain id of the masterchain itself.
pub const MASTERCHAIN_WORKCHAIN: i32 = -1;

/// Shard mask covering a whole workchain (the masterchain is never split).
pub const FULL_SHARD: u64 = 0x8000_0000_0000_0000;

// ─── ShardBlockId ─────────────────────────────────────────────────────────────

/// Structured key of a shard block.
///
/// Ordering is `(seqno, workchain, shard)` ascending, which is the order in
/// which the shard frontier is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardBlockId {
    pub workchain: i32,
    pub shard: u64,
    pub seqno: u32,
}

impl ShardBlockId {
    pub fn new(workchain: i32, shard: u64, seqno: u32) -> Self {
        Self {
            workchain,
            shard,
            seqno,
        }
    }

    /// Returns `true` if this id points into the masterchain.
    ///
    /// Such ids are the boundary of the shard-frontier traversal and are
    /// never stored in the shard ledger.
    pub fn is_masterchain(&self) -> bool {
        self.workchain == MASTERCHAIN_WORKCHAIN
    }

    /// Sort key used to pick the next frontier block.
    pub fn frontier_key(&self) -> (u32, i32, u64) {
        (self.seqno, self.workchain, self.shard)
    }
}

impl Ord for ShardBlockId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frontier_key().cmp(&other.frontier_key())
    }
}

impl PartialOrd for ShardBlockId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ShardBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{:016x},{})", self.workchain, self.shard, self.seqno)
    }
}

// ─── MasterchainHead ──────────────────────────────────────────────────────────

/// Latest masterchain block reported by a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterchainHead {
    pub workchain: i32,
    pub shard: u64,
    pub seqno: MasterchainSeqno,
}

impl MasterchainHead {
    /// A usable head lives in the masterchain and has a non-zero seqno.
    pub fn is_valid(&self) -> bool {
        self.workchain == MASTERCHAIN_WORKCHAIN && self.seqno > 0
    }
}

// ─── Block ────────────────────────────────────────────────────────────────────

/// Block header payload handed to event sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub workchain: i32,
    pub shard: u64,
    pub seqno: u32,
    /// Base64 root hash.
    pub root_hash: String,
    /// Base64 file hash.
    pub file_hash: String,
    /// Unix generation time (seconds).
    pub gen_utime: i64,
    pub start_lt: u64,
    pub end_lt: u64,
    /// Number of transactions, when the provider reports it.
    pub tx_count: Option<u32>,
    pub key_block: bool,
}

impl Block {
    /// Structured id of this block.
    pub fn id(&self) -> ShardBlockId {
        ShardBlockId::new(self.workchain, self.shard, self.seqno)
    }
}
