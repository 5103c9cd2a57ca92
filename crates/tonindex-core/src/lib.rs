//! tonindex-core — shared vocabulary of the tonindex block crawler.
//!
//! # Architecture
//!
//! ```text
//! CrawlerBuilder → Crawler
//!                     ├── ChainDataSource  (head, blocks, shard heads, shard proofs)
//!                     ├── BlockLedger      (dedup + crash recovery)
//!                     │     └── memory / SQLite / Postgres
//!                     └── EventSink        (block / shardBlock delivery)
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod sink;
pub mod source;
pub mod types;

pub use config::{CrawlerConfig, CrawlerState};
pub use error::IndexerError;
pub use ledger::{BlockLedger, LedgerStats};
pub use sink::{ChannelSink, CrawlEvent, EventSink, SinkRegistry};
pub use source::ChainDataSource;
pub use types::{
    Block, MasterchainHead, MasterchainSeqno, ShardBlockId, FULL_SHARD, MASTERCHAIN_WORKCHAIN,
};
