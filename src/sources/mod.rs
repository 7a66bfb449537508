//! Concrete fetchers for [`BlockPoller`](crate::poller::BlockPoller).

mod eth_rpc;

pub use eth_rpc::{http_client, EthRpcFetcher};
