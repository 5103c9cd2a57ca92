//! Wire types for the toncenter v2 and v3 APIs and their conversion into
//! core types.
//!
//! v3 reports shard masks as unsigned hex (`"8000000000000000"`); v2
//! reports them as signed decimal (`"-9223372036854775808"`). Numbers that
//! exceed JavaScript's safe range (`lt`, `utime`) arrive as strings.

use serde::Deserialize;

use tonindex_core::error::IndexerError;
use tonindex_core::types::{Block, MasterchainHead, ShardBlockId};

// ─── v3 ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct MasterchainInfo {
    pub last: RawBlock,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Blocks {
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBlock {
    pub workchain: i32,
    pub shard: String,
    pub seqno: u32,
    #[serde(default)]
    pub root_hash: String,
    #[serde(default)]
    pub file_hash: String,
    #[serde(default)]
    pub gen_utime: Option<NumberOrString>,
    #[serde(default)]
    pub start_lt: Option<NumberOrString>,
    #[serde(default)]
    pub end_lt: Option<NumberOrString>,
    #[serde(default)]
    pub tx_count: Option<u32>,
    #[serde(default)]
    pub key_block: bool,
}

impl RawBlock {
    pub fn head(&self) -> Result<MasterchainHead, IndexerError> {
        Ok(MasterchainHead {
            workchain: self.workchain,
            shard: parse_hex_shard(&self.shard)?,
            seqno: self.seqno,
        })
    }

    pub fn into_block(self) -> Result<Block, IndexerError> {
        Ok(Block {
            workchain: self.workchain,
            shard: parse_hex_shard(&self.shard)?,
            seqno: self.seqno,
            root_hash: self.root_hash,
            file_hash: self.file_hash,
            gen_utime: parse_opt(self.gen_utime, "gen_utime")?,
            start_lt: parse_opt(self.start_lt, "start_lt")?,
            end_lt: parse_opt(self.end_lt, "end_lt")?,
            tx_count: self.tx_count,
            key_block: self.key_block,
        })
    }
}

// ─── v2 ──────────────────────────────────────────────────────────────────────

/// `{ "ok": true, "result": … }` / `{ "ok": false, "error": "…", "code": … }`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

impl<T> Envelope<T> {
    pub fn into_result(self, method: &str) -> Result<T, IndexerError> {
        if !self.ok {
            return Err(IndexerError::InvalidChainResponse(format!(
                "{method}: provider error {}: {}",
                self.code.unwrap_or_default(),
                self.error.unwrap_or_else(|| "unknown".into())
            )));
        }
        self.result.ok_or_else(|| {
            IndexerError::InvalidChainResponse(format!("{method}: ok response without result"))
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Shards {
    pub shards: Vec<BlockIdExt>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShardBlockProof {
    #[serde(default)]
    pub links: Vec<ShardBlockLink>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShardBlockLink {
    pub id: BlockIdExt,
}

/// `ton.blockIdExt`
#[derive(Debug, Deserialize)]
pub(crate) struct BlockIdExt {
    pub workchain: i32,
    pub shard: NumberOrString,
    pub seqno: u32,
}

impl BlockIdExt {
    pub fn to_id(&self) -> Result<ShardBlockId, IndexerError> {
        Ok(ShardBlockId::new(
            self.workchain,
            parse_signed_shard(&self.shard)?,
            self.seqno,
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(i64),
    Text(String),
}

// ─── parsing ─────────────────────────────────────────────────────────────────

/// Parse a v3 shard mask (`"8000000000000000"`).
pub fn parse_hex_shard(raw: &str) -> Result<u64, IndexerError> {
    u64::from_str_radix(raw, 16)
        .map_err(|e| IndexerError::InvalidChainResponse(format!("bad hex shard {raw:?}: {e}")))
}

/// Parse a v2 shard mask (`"-9223372036854775808"`), reinterpreting the
/// signed value as the unsigned mask.
fn parse_signed_shard(raw: &NumberOrString) -> Result<u64, IndexerError> {
    match raw {
        NumberOrString::Number(n) => Ok(*n as u64),
        NumberOrString::Text(s) => s
            .parse::<i64>()
            .map(|n| n as u64)
            .or_else(|_| s.parse::<u64>())
            .map_err(|e| IndexerError::InvalidChainResponse(format!("bad shard {s:?}: {e}"))),
    }
}

/// Format a shard mask the way v2 expects it in query strings.
pub fn format_signed_shard(shard: u64) -> String {
    (shard as i64).to_string()
}

fn parse_opt<T>(raw: Option<NumberOrString>, field: &str) -> Result<T, IndexerError>
where
    T: TryFrom<i64> + std::str::FromStr + Default,
{
    let bad = || IndexerError::InvalidChainResponse(format!("bad {field} value"));
    match raw {
        None => Ok(T::default()),
        Some(NumberOrString::Number(n)) => T::try_from(n).map_err(|_| bad()),
        Some(NumberOrString::Text(s)) => s.parse().map_err(|_| bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonindex_core::types::{FULL_SHARD, MASTERCHAIN_WORKCHAIN};

    const BLOCK_V3: &str = r#"{
        "workchain": -1,
        "shard": "8000000000000000",
        "seqno": 38000000,
        "root_hash": "cm9vdA==",
        "file_hash": "ZmlsZQ==",
        "global_id": -239,
        "key_block": false,
        "gen_utime": "1712345678",
        "start_lt": "46000000000000",
        "end_lt": "46000000000004",
        "tx_count": 3,
        "masterchain_block_ref": null
    }"#;

    #[test]
    fn v3_block_converts() {
        let raw: RawBlock = serde_json::from_str(BLOCK_V3).unwrap();
        let block = raw.into_block().unwrap();
        assert_eq!(block.workchain, MASTERCHAIN_WORKCHAIN);
        assert_eq!(block.shard, FULL_SHARD);
        assert_eq!(block.seqno, 38_000_000);
        assert_eq!(block.gen_utime, 1_712_345_678);
        assert_eq!(block.start_lt, 46_000_000_000_000);
        assert_eq!(block.end_lt, 46_000_000_000_004);
        assert_eq!(block.tx_count, Some(3));
        assert_eq!(block.root_hash, "cm9vdA==");
    }

    #[test]
    fn v3_masterchain_info_head() {
        let json = format!(r#"{{"first": {BLOCK_V3}, "last": {BLOCK_V3}}}"#);
        let info: MasterchainInfo = serde_json::from_str(&json).unwrap();
        let head = info.last.head().unwrap();
        assert!(head.is_valid());
        assert_eq!(head.seqno, 38_000_000);
    }

    #[test]
    fn v3_empty_blocks() {
        let blocks: Blocks = serde_json::from_str(r#"{"blocks": []}"#).unwrap();
        assert!(blocks.blocks.is_empty());
    }

    #[test]
    fn v2_shards_parse_signed_masks() {
        let json = r#"{
            "ok": true,
            "result": {
                "@type": "blocks.shards",
                "shards": [
                    {"@type": "ton.blockIdExt", "workchain": 0, "shard": "-9223372036854775808", "seqno": 43000000, "root_hash": "", "file_hash": ""},
                    {"@type": "ton.blockIdExt", "workchain": 0, "shard": "4611686018427387904", "seqno": 43000001, "root_hash": "", "file_hash": ""}
                ]
            }
        }"#;
        let env: Envelope<Shards> = serde_json::from_str(json).unwrap();
        let shards = env.into_result("shards").unwrap();
        let ids: Vec<_> = shards.shards.iter().map(|s| s.to_id().unwrap()).collect();
        assert_eq!(ids[0], ShardBlockId::new(0, FULL_SHARD, 43_000_000));
        assert_eq!(ids[1], ShardBlockId::new(0, 0x4000_0000_0000_0000, 43_000_001));
    }

    #[test]
    fn v2_proof_links_are_parents() {
        let json = r#"{
            "ok": true,
            "result": {
                "@type": "blocks.shardBlockProof",
                "from": {"@type": "ton.blockIdExt", "workchain": 0, "shard": "-9223372036854775808", "seqno": 10},
                "links": [
                    {"@type": "blocks.shardBlockLink", "id": {"@type": "ton.blockIdExt", "workchain": 0, "shard": "-9223372036854775808", "seqno": 9}, "proof": "te6c"},
                    {"@type": "blocks.shardBlockLink", "id": {"@type": "ton.blockIdExt", "workchain": -1, "shard": "-9223372036854775808", "seqno": 99}, "proof": "te6c"}
                ]
            }
        }"#;
        let env: Envelope<ShardBlockProof> = serde_json::from_str(json).unwrap();
        let proof = env.into_result("getShardBlockProof").unwrap();
        let ids: Vec<_> = proof.links.iter().map(|l| l.id.to_id().unwrap()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ShardBlockId::new(0, FULL_SHARD, 9));
        assert!(ids[1].is_masterchain());
    }

    #[test]
    fn v2_error_envelope() {
        let json = r#"{"ok": false, "error": "LITE_SERVER_UNKNOWN: block not found", "code": 500}"#;
        let env: Envelope<Shards> = serde_json::from_str(json).unwrap();
        let err = env.into_result("shards").unwrap_err();
        assert!(matches!(err, IndexerError::InvalidChainResponse(ref m) if m.contains("block not found")));
    }

    #[test]
    fn shard_mask_formats() {
        assert_eq!(parse_hex_shard("8000000000000000").unwrap(), FULL_SHARD);
        assert!(parse_hex_shard("zz").is_err());
        assert_eq!(format_signed_shard(FULL_SHARD), "-9223372036854775808");
        assert_eq!(
            parse_signed_shard(&NumberOrString::Number(i64::MIN)).unwrap(),
            FULL_SHARD
        );
    }
}
