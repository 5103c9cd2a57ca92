//! Fluent builder API for creating crawlers.
//!
//! # Example
//!
//! ```rust,no_run
//! use tonindex_crawler::CrawlerBuilder;
//!
//! let config = CrawlerBuilder::new()
//!     .chain("mainnet")
//!     .start_seqno(38_000_000)
//!     .poll_interval_ms(1_000)
//!     .shards(true)
//!     .build_config();
//! ```

use std::sync::Arc;

use tonindex_core::config::CrawlerConfig;
use tonindex_core::ledger::BlockLedger;
use tonindex_core::sink::EventSink;
use tonindex_core::source::ChainDataSource;
use tonindex_core::types::MasterchainSeqno;

use crate::crawl_loop::Crawler;

/// Fluent builder for `CrawlerConfig` and `Crawler`.
#[derive(Default)]
pub struct CrawlerBuilder {
    config: CrawlerConfig,
}

impl CrawlerBuilder {
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Start from an existing config.
    pub fn from_config(config: CrawlerConfig) -> Self {
        Self { config }
    }

    /// Set the chain label used in logs.
    pub fn chain(mut self, chain: impl Into<String>) -> Self {
        self.config.chain = chain.into();
        self
    }

    /// Set the first masterchain seqno to ingest.
    pub fn start_seqno(mut self, seqno: MasterchainSeqno) -> Self {
        self.config.start_seqno = Some(seqno);
        self
    }

    /// Set the polling interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the delay after a failed tick in milliseconds.
    pub fn error_backoff_ms(mut self, ms: u64) -> Self {
        self.config.error_backoff_ms = Some(ms);
        self
    }

    /// Enable shard-frontier traversal.
    pub fn shards(mut self, enabled: bool) -> Self {
        self.config.shards = enabled;
        self
    }

    /// Build the `CrawlerConfig`.
    pub fn build_config(self) -> CrawlerConfig {
        self.config
    }

    /// Build a `Crawler` over the given source, ledger and sink.
    pub fn build<S, L>(self, source: S, ledger: L, sink: Arc<dyn EventSink>) -> Crawler<S, L>
    where
        S: ChainDataSource,
        L: BlockLedger,
    {
        Crawler::new(self.config, source, ledger, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let cfg = CrawlerBuilder::new().build_config();
        assert_eq!(cfg.chain, "ton");
        assert_eq!(cfg.poll_interval_ms, 5_000);
        assert_eq!(cfg.start_seqno, None);
        assert!(!cfg.shards);
    }

    #[test]
    fn builder_custom() {
        let cfg = CrawlerBuilder::new()
            .chain("testnet")
            .start_seqno(400)
            .poll_interval_ms(250)
            .error_backoff_ms(2_000)
            .shards(true)
            .build_config();

        assert_eq!(cfg.chain, "testnet");
        assert_eq!(cfg.start_seqno, Some(400));
        assert_eq!(cfg.poll_interval_ms, 250);
        assert_eq!(cfg.error_backoff_ms, Some(2_000));
        assert!(cfg.shards);
    }

    #[test]
    fn from_config_keeps_fields() {
        let base = CrawlerConfig {
            start_seqno: Some(7),
            ..Default::default()
        };
        let cfg = CrawlerBuilder::from_config(base.clone())
            .shards(true)
            .build_config();
        assert_eq!(cfg.start_seqno, Some(7));
        assert!(cfg.shards);
        assert_eq!(cfg.poll_interval_ms, base.poll_interval_ms);
    }
}
