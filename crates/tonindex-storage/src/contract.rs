//! Behaviour every `BlockLedger` backend must share. Each backend's test
//! module runs these against a fresh instance.

use tonindex_core::error::IndexerError;
use tonindex_core::ledger::BlockLedger;
use tonindex_core::types::{ShardBlockId, FULL_SHARD, MASTERCHAIN_WORKCHAIN};

const LEFT: u64 = 0x4000_0000_0000_0000;
const RIGHT: u64 = 0xc000_0000_0000_0000;

fn shard(shard: u64, seqno: u32) -> ShardBlockId {
    ShardBlockId::new(0, shard, seqno)
}

pub(crate) async fn duplicate_masterchain_insert_fails<L: BlockLedger>(ledger: &L) {
    ledger.insert_masterchain_block(100).await.unwrap();
    let err = ledger.insert_masterchain_block(100).await.unwrap_err();
    assert!(matches!(err, IndexerError::DuplicateBlock { seqno: 100 }));

    // A clean in between makes the seqno insertable again.
    ledger.clean().await.unwrap();
    ledger.insert_masterchain_block(100).await.unwrap();
}

pub(crate) async fn last_masterchain_block_is_max<L: BlockLedger>(ledger: &L) {
    assert_eq!(ledger.get_last_masterchain_block().await.unwrap(), None);

    for seqno in [105, 101, 103] {
        ledger.insert_masterchain_block(seqno).await.unwrap();
    }
    assert_eq!(ledger.get_last_masterchain_block().await.unwrap(), Some(105));
}

pub(crate) async fn shard_insert_is_idempotent<L: BlockLedger>(ledger: &L) {
    ledger
        .insert_shardchain_blocks(&[shard(LEFT, 1), shard(LEFT, 2)])
        .await
        .unwrap();
    ledger
        .insert_shardchain_blocks(&[shard(LEFT, 2), shard(RIGHT, 2), shard(RIGHT, 2)])
        .await
        .unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.shard_blocks, 3);
    assert_eq!(stats.unprocessed_shard_blocks, 3);

    // Re-discovering a processed block must not reopen it.
    ledger
        .set_shardchain_block_processed(&shard(LEFT, 1), &[])
        .await
        .unwrap();
    ledger.insert_shardchain_blocks(&[shard(LEFT, 1)]).await.unwrap();
    assert_eq!(ledger.stats().await.unwrap().unprocessed_shard_blocks, 2);
    assert_eq!(
        ledger.get_unprocessed_shardchain_block().await.unwrap(),
        Some(shard(LEFT, 2))
    );
}

pub(crate) async fn frontier_returns_global_minimum<L: BlockLedger>(ledger: &L) {
    let ids = [
        shard(RIGHT, 7),
        ShardBlockId::new(1, LEFT, 5),
        shard(RIGHT, 5),
        shard(LEFT, 5),
        shard(LEFT, 9),
    ];
    ledger.insert_shardchain_blocks(&ids).await.unwrap();

    let mut order = Vec::new();
    while let Some(id) = ledger.get_unprocessed_shardchain_block().await.unwrap() {
        ledger.set_shardchain_block_processed(&id, &[]).await.unwrap();
        order.push(id);
    }
    assert_eq!(
        order,
        vec![
            shard(LEFT, 5),
            shard(RIGHT, 5),
            ShardBlockId::new(1, LEFT, 5),
            shard(RIGHT, 7),
            shard(LEFT, 9),
        ]
    );
}

pub(crate) async fn processing_enqueues_parents<L: BlockLedger>(ledger: &L) {
    ledger.insert_shardchain_blocks(&[shard(LEFT, 10)]).await.unwrap();
    ledger
        .set_shardchain_block_processed(&shard(LEFT, 10), &[shard(LEFT, 9)])
        .await
        .unwrap();

    assert_eq!(
        ledger.get_unprocessed_shardchain_block().await.unwrap(),
        Some(shard(LEFT, 9))
    );
    ledger
        .set_shardchain_block_processed(&shard(LEFT, 9), &[])
        .await
        .unwrap();
    assert_eq!(ledger.get_unprocessed_shardchain_block().await.unwrap(), None);

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.shard_blocks, 2);
    assert_eq!(stats.unprocessed_shard_blocks, 0);
}

pub(crate) async fn processing_unknown_or_processed_fails<L: BlockLedger>(ledger: &L) {
    let err = ledger
        .set_shardchain_block_processed(&shard(LEFT, 1), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::NotFound { .. }));

    ledger.insert_shardchain_blocks(&[shard(LEFT, 1)]).await.unwrap();
    ledger
        .set_shardchain_block_processed(&shard(LEFT, 1), &[shard(LEFT, 0)])
        .await
        .unwrap();
    let err = ledger
        .set_shardchain_block_processed(&shard(LEFT, 1), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::NotFound { .. }));
}

pub(crate) async fn masterchain_ids_never_enter_frontier<L: BlockLedger>(ledger: &L) {
    let mc = ShardBlockId::new(MASTERCHAIN_WORKCHAIN, FULL_SHARD, 1);
    ledger.insert_shardchain_blocks(&[mc]).await.unwrap();
    assert_eq!(ledger.get_unprocessed_shardchain_block().await.unwrap(), None);

    ledger.insert_shardchain_blocks(&[shard(LEFT, 3)]).await.unwrap();
    ledger
        .set_shardchain_block_processed(&shard(LEFT, 3), &[mc])
        .await
        .unwrap();
    assert_eq!(ledger.get_unprocessed_shardchain_block().await.unwrap(), None);
    assert_eq!(ledger.stats().await.unwrap().shard_blocks, 1);
}

pub(crate) async fn clean_empties_everything<L: BlockLedger>(ledger: &L) {
    ledger.insert_masterchain_block(500).await.unwrap();
    ledger
        .insert_shardchain_blocks(&[shard(LEFT, 1), shard(RIGHT, 1)])
        .await
        .unwrap();

    ledger.clean().await.unwrap();

    assert_eq!(ledger.get_last_masterchain_block().await.unwrap(), None);
    assert_eq!(ledger.get_unprocessed_shardchain_block().await.unwrap(), None);
    assert_eq!(ledger.stats().await.unwrap(), Default::default());
}
