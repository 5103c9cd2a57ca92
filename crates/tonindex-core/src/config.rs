//! Crawler configuration and state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::MasterchainSeqno;

/// Configuration for a crawler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Label attached to log lines (e.g. `"mainnet"`).
    pub chain: String,
    /// Delay between polling ticks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Delay after a failed tick. `None` = same as `poll_interval_ms`.
    pub error_backoff_ms: Option<u64>,
    /// First masterchain block to ingest. `None` = current head.
    ///
    /// A value below what the ledger already holds wipes the ledger on
    /// start, forcing a resync from here.
    pub start_seqno: Option<MasterchainSeqno>,
    /// Also crawl the shard-block graph behind every masterchain block.
    pub shards: bool,
}

impl CrawlerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms.unwrap_or(self.poll_interval_ms))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            chain: "ton".into(),
            poll_interval_ms: 5_000,
            error_backoff_ms: None,
            start_seqno: None,
            shards: false,
        }
    }
}

/// Runtime state of the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlerState {
    /// Not yet started.
    Idle,
    /// Resolving the start seqno.
    Starting,
    /// Walking masterchain blocks up to the head.
    AdvancingMasterchain,
    /// Draining the shard frontier behind a masterchain block.
    ExpandingShardFrontier,
    /// Stop requested; finishing the current step.
    Stopping,
    /// Loop exited.
    Stopped,
}

impl CrawlerState {
    /// `true` while the polling loop owns the ledger.
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Idle | Self::Stopped)
    }
}

impl std::fmt::Display for CrawlerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::AdvancingMasterchain => write!(f, "advancing-masterchain"),
            Self::ExpandingShardFrontier => write!(f, "expanding-shard-frontier"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
