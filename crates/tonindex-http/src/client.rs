//! toncenter HTTP client backed by `reqwest`.
//!
//! Masterchain head and blocks come from the v3 indexer API; shard heads and
//! shard-block proofs come from the v2 API, which is the only one exposing
//! proof links.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use tonindex_core::error::IndexerError;
use tonindex_core::source::ChainDataSource;
use tonindex_core::types::{
    Block, MasterchainHead, MasterchainSeqno, ShardBlockId, FULL_SHARD, MASTERCHAIN_WORKCHAIN,
};

use crate::schema::{
    format_signed_shard, Blocks, Envelope, MasterchainInfo, ShardBlockProof, Shards,
};

/// Configuration for `ToncenterClient`.
#[derive(Debug, Clone)]
pub struct ToncenterConfig {
    /// Base URL, e.g. `https://toncenter.com`. A trailing `/` is ignored.
    pub endpoint: String,
    /// Sent as the `api_key` query parameter.
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ToncenterConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://toncenter.com".into(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// `ChainDataSource` over the public toncenter API.
pub struct ToncenterClient {
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl ToncenterClient {
    pub fn new(config: ToncenterConfig) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IndexerError::Other(format!("failed to build http client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            http,
        })
    }

    /// Create with default configuration for `endpoint`.
    pub fn default_for(endpoint: impl Into<String>) -> Result<Self, IndexerError> {
        Self::new(ToncenterConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, IndexerError> {
        let mut req = self.http.get(self.url(path)).query(query);
        if let Some(key) = &self.api_key {
            req = req.query(&[("api_key", key)]);
        }

        tracing::debug!(path, "toncenter request");
        let resp = req
            .send()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{path}: {e}")))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexerError::Rpc(format!(
                "{path}: HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{path}: {e}")))?;
        serde_json::from_str(&body).map_err(|e| {
            IndexerError::InvalidChainResponse(format!("{path}: undecodable response: {e}"))
        })
    }

    /// GET a v2 method and unwrap its `{ok, result}` envelope.
    async fn get_v2<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, IndexerError> {
        let envelope: Envelope<T> = self.get(path, query).await?;
        envelope.into_result(path)
    }
}

#[async_trait]
impl ChainDataSource for ToncenterClient {
    async fn get_head(&self) -> Result<MasterchainHead, IndexerError> {
        let info: MasterchainInfo = self.get("/api/v3/masterchainInfo", &[]).await?;
        info.last.head()
    }

    async fn get_block_at(&self, seqno: MasterchainSeqno) -> Result<Option<Block>, IndexerError> {
        let query = [
            ("workchain", MASTERCHAIN_WORKCHAIN.to_string()),
            ("shard", format!("{FULL_SHARD:016x}")),
            ("seqno", seqno.to_string()),
        ];
        let blocks: Blocks = self.get("/api/v3/blocks", &query).await?;
        blocks
            .blocks
            .into_iter()
            .next()
            .map(|raw| raw.into_block())
            .transpose()
    }

    async fn get_shard_heads(
        &self,
        seqno: MasterchainSeqno,
    ) -> Result<Vec<ShardBlockId>, IndexerError> {
        let shards: Shards = self
            .get_v2("/api/v2/shards", &[("seqno", seqno.to_string())])
            .await?;
        shards.shards.iter().map(|s| s.to_id()).collect()
    }

    async fn get_shard_block_proof(
        &self,
        id: &ShardBlockId,
    ) -> Result<Vec<ShardBlockId>, IndexerError> {
        let query = [
            ("workchain", id.workchain.to_string()),
            ("shard", format_signed_shard(id.shard)),
            ("seqno", id.seqno.to_string()),
        ];
        let proof: ShardBlockProof = self
            .get_v2("/api/v2/getShardBlockProof", &query)
            .await?;
        proof.links.iter().map(|l| l.id.to_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let client = ToncenterClient::default_for("https://toncenter.com/").unwrap();
        assert_eq!(client.endpoint(), "https://toncenter.com");
        assert_eq!(
            client.url("/api/v3/masterchainInfo"),
            "https://toncenter.com/api/v3/masterchainInfo"
        );
    }

    #[test]
    fn default_config() {
        let cfg = ToncenterConfig::default();
        assert_eq!(cfg.endpoint, "https://toncenter.com");
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_rpc_error() {
        let client = ToncenterClient::new(ToncenterConfig {
            endpoint: "http://127.0.0.1:1".into(),
            api_key: Some("secret".into()),
            request_timeout: Duration::from_secs(2),
        })
        .unwrap();
        assert!(matches!(
            client.get_head().await,
            Err(IndexerError::Rpc(_))
        ));
    }
}
