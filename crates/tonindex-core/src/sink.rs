//! Event sinks: where crawled blocks are delivered.
//!
//! Delivery is push-only: sinks have no way to acknowledge or reject an
//! event, so a sink that needs durability must persist on its own.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{Block, ShardBlockId};

/// An event emitted by the crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CrawlEvent {
    /// A masterchain block, in strictly increasing seqno order.
    Block { block: Block },
    /// A shard block whose parents have been resolved.
    ShardBlock { id: ShardBlockId },
}

/// Receiver of crawler events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Called once per masterchain block.
    async fn on_block(&self, block: &Block);

    /// Called once per expanded shard block. Ignored by default.
    async fn on_shard_block(&self, _id: &ShardBlockId) {}
}

// ─── SinkRegistry ─────────────────────────────────────────────────────────────

/// Fan-out to several sinks, in registration order.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub fn register(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for SinkRegistry {
    async fn on_block(&self, block: &Block) {
        for sink in &self.sinks {
            sink.on_block(block).await;
        }
    }

    async fn on_shard_block(&self, id: &ShardBlockId) {
        for sink in &self.sinks {
            sink.on_shard_block(id).await;
        }
    }
}

// ─── ChannelSink ──────────────────────────────────────────────────────────────

/// Forwards events into an unbounded tokio channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CrawlEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CrawlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: CrawlEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event receiver dropped, discarding event");
        }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn on_block(&self, block: &Block) {
        self.send(CrawlEvent::Block {
            block: block.clone(),
        });
    }

    async fn on_shard_block(&self, id: &ShardBlockId) {
        self.send(CrawlEvent::ShardBlock { id: *id });
    }
}
