//! The crawler: walks the masterchain up to the head and, optionally, the
//! shard-block graph behind each masterchain block.
//!
//! # Masterchain
//! Every tick resumes at `last saved + 1` (or the start seqno on an empty
//! ledger), fetches the head, and for each seqno up to it:
//! fetch block → record in ledger → emit `block`.
//!
//! # Shard frontier
//! After a masterchain block is emitted, its shard heads are added to the
//! ledger's frontier. The frontier is then drained lowest-seqno-first: fetch
//! the block's proof parents, mark it processed (which enqueues the parents),
//! emit `shardBlock`. Parents in the masterchain are dropped by the fetcher,
//! and already-known ids are ignored by the ledger, so the walk stops at
//! blocks discovered by earlier heights.
//!
//! # Failures
//! Any error aborts the current tick. It is logged, the crawler sleeps for
//! the error backoff, and the next tick resumes from the ledger. There is no
//! retry limit; only [`Crawler::stop`] ends the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tonindex_core::config::{CrawlerConfig, CrawlerState};
use tonindex_core::error::IndexerError;
use tonindex_core::ledger::BlockLedger;
use tonindex_core::sink::EventSink;
use tonindex_core::source::ChainDataSource;
use tonindex_core::types::MasterchainSeqno;

use crate::fetcher::ChainFetcher;

/// Block crawler over a data source, a ledger and an event sink.
pub struct Crawler<S, L> {
    config: CrawlerConfig,
    fetcher: ChainFetcher<S>,
    ledger: L,
    sink: Arc<dyn EventSink>,
    state: watch::Sender<CrawlerState>,
    stopped: AtomicBool,
    wake: Notify,
}

impl<S: ChainDataSource, L: BlockLedger> Crawler<S, L> {
    pub fn new(config: CrawlerConfig, source: S, ledger: L, sink: Arc<dyn EventSink>) -> Self {
        let (state, _) = watch::channel(CrawlerState::Idle);
        Self {
            config,
            fetcher: ChainFetcher::new(source),
            ledger,
            sink,
            state,
            stopped: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Current state.
    pub fn state(&self) -> CrawlerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<CrawlerState> {
        self.state.subscribe()
    }

    /// Resolve the start seqno and run the polling loop until [`stop`] is
    /// called.
    ///
    /// Only fails if no start seqno is configured and the head query used
    /// to pick one fails, or if the crawler is already running.
    ///
    /// [`stop`]: Crawler::stop
    pub async fn start(&self) -> Result<(), IndexerError> {
        self.claim("start")?;
        self.run().await
    }

    /// Run [`start`](Crawler::start) on a tokio task.
    ///
    /// Fails with `Aborted`, without touching the running loop, if the
    /// crawler has not fully stopped yet.
    pub fn spawn(self: Arc<Self>) -> Result<CrawlerHandle<S, L>, IndexerError>
    where
        S: 'static,
        L: 'static,
    {
        self.claim("spawn")?;
        let crawler = self.clone();
        let task = tokio::spawn(async move { crawler.run().await });
        Ok(CrawlerHandle {
            crawler: self,
            task,
        })
    }

    /// Ask the loop to stop. Observed before the next masterchain seqno or
    /// frontier pop; in-flight requests are not interrupted.
    pub fn stop(&self) {
        self.state.send_if_modified(|state| {
            self.stopped.store(true, Ordering::SeqCst);
            if !state.is_running() || *state == CrawlerState::Stopping {
                return false;
            }
            *state = CrawlerState::Stopping;
            true
        });
        self.wake.notify_waiters();
        info!(chain = %self.config.chain, "stop crawler");
    }

    /// Wipe the ledger. Only allowed while the crawler is not running.
    pub async fn clean(&self) -> Result<(), IndexerError> {
        self.ensure_stopped("clean")?;
        self.ledger.clean().await?;
        info!(chain = %self.config.chain, "clean storage");
        Ok(())
    }

    fn ensure_stopped(&self, op: &str) -> Result<(), IndexerError> {
        let state = self.state();
        if state.is_running() {
            return Err(already_running(op, state));
        }
        Ok(())
    }

    /// Move from a stopped state to `Starting` and clear the stop flag, as
    /// one step under the state lock.
    fn claim(&self, op: &str) -> Result<(), IndexerError> {
        let mut seen = CrawlerState::Idle;
        let claimed = self.state.send_if_modified(|state| {
            seen = *state;
            if state.is_running() {
                return false;
            }
            self.stopped.store(false, Ordering::SeqCst);
            *state = CrawlerState::Starting;
            true
        });
        if claimed {
            Ok(())
        } else {
            Err(already_running(op, seen))
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Move to `next` unless a stop has been requested.
    fn enter(&self, next: CrawlerState) {
        self.state.send_if_modified(|state| {
            if self.is_stopped() || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }

    /// Sleep for `delay`, waking early on stop.
    async fn pause(&self, delay: Duration) {
        // Registered before the flag check: a stop() landing in between
        // still wakes this sleep.
        let woken = self.wake.notified();
        if self.is_stopped() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = woken => {}
        }
    }

    async fn run(&self) -> Result<(), IndexerError> {
        info!(chain = %self.config.chain, "start crawler");

        let start_seqno = match self.resolve_start().await {
            Ok(Some(seqno)) => seqno,
            Ok(None) => {
                self.state.send_replace(CrawlerState::Stopped);
                return Ok(());
            }
            Err(e) => {
                self.state.send_replace(CrawlerState::Stopped);
                return Err(e);
            }
        };
        info!(chain = %self.config.chain, start_seqno, "crawler started");

        self.poll(start_seqno).await;

        self.state.send_replace(CrawlerState::Stopped);
        info!(chain = %self.config.chain, "crawler stopped");
        Ok(())
    }

    /// Effective start seqno, or `None` if stopped before it was known.
    async fn resolve_start(&self) -> Result<Option<MasterchainSeqno>, IndexerError> {
        let Some(start_seqno) = self.config.start_seqno else {
            let head = self.fetcher.head().await?;
            return Ok(Some(head.seqno));
        };

        // Ledger trouble here is retried like any tick error.
        while !self.is_stopped() {
            match self.reconcile_ledger(start_seqno).await {
                Ok(()) => return Ok(Some(start_seqno)),
                Err(e) => {
                    error!(chain = %self.config.chain, error = %e, "start-up ledger check failed");
                    self.pause(self.config.error_backoff()).await;
                }
            }
        }
        Ok(None)
    }

    /// Wipe the ledger if it already holds progress past `start_seqno`.
    async fn reconcile_ledger(&self, start_seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        if let Some(last_saved) = self.ledger.get_last_masterchain_block().await? {
            if start_seqno < last_saved {
                warn!(
                    start_seqno,
                    last_saved,
                    "start seqno is behind saved progress, clearing ledger for resync"
                );
                self.ledger.clean().await?;
            }
        }
        Ok(())
    }

    async fn poll(&self, start_seqno: MasterchainSeqno) {
        while !self.is_stopped() {
            let delay = match self.tick(start_seqno).await {
                Ok(()) => self.config.poll_interval(),
                Err(e) => {
                    error!(chain = %self.config.chain, error = %e, "masterchain tick error");
                    self.config.error_backoff()
                }
            };
            if self.is_stopped() {
                break;
            }
            self.pause(delay).await;
        }
    }

    /// One pass from the saved position up to the current head.
    async fn tick(&self, start_seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        self.enter(CrawlerState::AdvancingMasterchain);

        if self.config.shards {
            // Leftovers from a tick (or process) that died mid-frontier.
            self.drain_frontier().await?;
            self.enter(CrawlerState::AdvancingMasterchain);
        }

        let last_saved = self.ledger.get_last_masterchain_block().await?;
        let from = last_saved.map_or(start_seqno, |s| s.saturating_add(1));
        let head = self.fetcher.head().await?;

        for seqno in from..=head.seqno {
            if self.is_stopped() {
                return Ok(());
            }
            info!(chain = %self.config.chain, seqno, "masterchain tick");

            let block = self.fetcher.block_at(seqno).await?;
            self.ledger.insert_masterchain_block(seqno).await?;
            self.sink.on_block(&block).await;

            if self.config.shards {
                self.expand_shard_frontier(seqno).await?;
                self.enter(CrawlerState::AdvancingMasterchain);
            }
        }
        Ok(())
    }

    async fn expand_shard_frontier(&self, seqno: MasterchainSeqno) -> Result<(), IndexerError> {
        self.enter(CrawlerState::ExpandingShardFrontier);

        let heads = self.fetcher.shard_heads(seqno).await?;
        debug!(seqno, heads = heads.len(), "shard heads discovered");
        self.ledger.insert_shardchain_blocks(&heads).await?;

        self.drain_frontier().await
    }

    /// Expand unprocessed shard blocks until none are left.
    async fn drain_frontier(&self) -> Result<(), IndexerError> {
        loop {
            if self.is_stopped() {
                return Ok(());
            }
            let Some(id) = self.ledger.get_unprocessed_shardchain_block().await? else {
                return Ok(());
            };
            self.enter(CrawlerState::ExpandingShardFrontier);

            let parents = self.fetcher.parents(&id).await?;
            self.ledger.set_shardchain_block_processed(&id, &parents).await?;
            debug!(%id, parents = parents.len(), "shardchain block processed");
            self.sink.on_shard_block(&id).await;
        }
    }
}

fn already_running(op: &str, state: CrawlerState) -> IndexerError {
    IndexerError::Aborted {
        reason: format!("{op}() requires a stopped crawler (state: {state})"),
    }
}

// ─── CrawlerHandle ───────────────────────────────────────────────────────────

/// A crawler running on a tokio task.
pub struct CrawlerHandle<S, L> {
    crawler: Arc<Crawler<S, L>>,
    task: JoinHandle<Result<(), IndexerError>>,
}

impl<S: ChainDataSource, L: BlockLedger> CrawlerHandle<S, L> {
    pub fn crawler(&self) -> &Arc<Crawler<S, L>> {
        &self.crawler
    }

    pub fn stop(&self) {
        self.crawler.stop();
    }

    /// Wait for the task to finish.
    pub async fn join(self) -> Result<(), IndexerError> {
        self.task.await.map_err(|e| IndexerError::Aborted {
            reason: format!("crawler task failed: {e}"),
        })?
    }

    /// Stop and wait.
    pub async fn shutdown(self) -> Result<(), IndexerError> {
        self.stop();
        self.join().await
    }
}
