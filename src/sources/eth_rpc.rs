use crate::{
    block::{Block, FetchedBlock},
    poller::BlockFetcher,
};
use alloy_primitives::{hex, B256, U64};
use futures::{future::BoxFuture, FutureExt};
use jsonrpsee::{
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use jsonrpsee_core::client::ClientT;
use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::debug;

pub fn http_client(url: &str, request_timeout: Duration) -> eyre::Result<HttpClient> {
    Ok(HttpClientBuilder::default().request_timeout(request_timeout).build(url)?)
}

/// Highest head and finalized numbers seen on any client.
#[derive(Debug, Default)]
struct ChainHead {
    latest: AtomicU64,
    finalized: AtomicU64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockHeader {
    number: U64,
    hash: B256,
    parent_hash: B256,
    timestamp: U64,
}

/// Fetches blocks over Ethereum JSON-RPC (`eth_getBlockByNumber`).
///
/// The full JSON block, transactions included, becomes the block payload. The last irreversible
/// number is the chain's `finalized` block, capped at the block itself.
#[derive(Debug, Clone, Default)]
pub struct EthRpcFetcher {
    head: Arc<ChainHead>,
}

impl EthRpcFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_block_number(&self) -> u64 {
        self.head.latest.load(Ordering::Relaxed)
    }

    pub fn finalized_block_number(&self) -> u64 {
        self.head.finalized.load(Ordering::Relaxed)
    }

    async fn refresh_head(client: &HttpClient, head: &ChainHead) -> eyre::Result<()> {
        let latest: U64 = client.request("eth_blockNumber", rpc_params![]).await?;
        head.latest.fetch_max(latest.to::<u64>(), Ordering::Relaxed);

        let finalized: Result<Option<RpcBlockHeader>, _> =
            client.request("eth_getBlockByNumber", rpc_params!["finalized", false]).await;
        match finalized {
            Ok(Some(header)) => {
                head.finalized.fetch_max(header.number.to::<u64>(), Ordering::Relaxed);
            }
            Ok(None) => {}
            Err(err) => debug!(%err, "Finalized block not available"),
        }
        Ok(())
    }
}

impl BlockFetcher<HttpClient> for EthRpcFetcher {
    fn is_block_available(&self, number: u64) -> bool {
        number <= self.latest_block_number()
    }

    fn fetch(
        &self,
        client: Arc<HttpClient>,
        number: u64,
    ) -> BoxFuture<'static, eyre::Result<FetchedBlock>> {
        let head = self.head.clone();
        async move {
            if number > head.latest.load(Ordering::Relaxed) {
                Self::refresh_head(&client, &head).await?;
                let latest = head.latest.load(Ordering::Relaxed);
                if number > latest {
                    return Err(eyre::eyre!("Block {number} not yet available, head is {latest}"));
                }
            }

            let block: Option<serde_json::Value> = client
                .request("eth_getBlockByNumber", rpc_params![format!("0x{number:x}"), true])
                .await?;
            let block = block.ok_or_else(|| eyre::eyre!("Block {number} not found"))?;
            Ok(decode_block(block, head.finalized.load(Ordering::Relaxed))?.into())
        }
        .boxed()
    }
}

fn decode_block(value: serde_json::Value, finalized: u64) -> eyre::Result<Block> {
    let header = RpcBlockHeader::deserialize(&value)?;
    let number = header.number.to::<u64>();
    Ok(Block {
        number,
        id: hex::encode(header.hash),
        parent_num: number.saturating_sub(1),
        parent_id: hex::encode(header.parent_hash),
        lib_num: finalized.min(number),
        timestamp: header.timestamp.to::<u64>(),
        payload: serde_json::to_vec(&value)?.into(),
    })
}
