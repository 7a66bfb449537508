use crate::{
    finality::{parse_force_finality_after_blocks, FORCE_FINALITY_AFTER_BLOCKS_ENV},
    poller::{BlockPoller, FireBlockHandler, PollerConfig, PollerError},
    rpc::Clients,
    sources::{http_client, EthRpcFetcher},
};
use clap::Parser;
use jsonrpsee::http_client::HttpClient;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_BLOCK_TYPE: &str = "sf.ethereum.type.v2.Block";

/// Polls blocks from redundant JSON-RPC endpoints and prints them as Firehose `FIRE` lines.
#[derive(Debug, Parser)]
#[command(name = "block-poller", version)]
pub struct PollerCommand {
    /// RPC endpoints, in priority order. The first one is always tried first.
    /// Example: --endpoints http://node-a:8545,http://node-b:8545
    #[arg(long, env = "POLLER_ENDPOINTS", value_delimiter = ',', required = true, num_args = 1..)]
    pub endpoints: Vec<String>,

    /// First block number to poll.
    #[arg(long)]
    pub start_block: u64,

    /// Stop before this block number. Polls forever when omitted.
    #[arg(long)]
    pub stop_block: Option<u64>,

    /// Number of block numbers kept in flight. `1` polls strictly sequentially.
    #[arg(long, default_value_t = 1)]
    pub fetch_batch_size: usize,

    /// Timeout of a single attempt against one endpoint, in seconds.
    #[arg(long, default_value_t = 10)]
    pub max_block_fetch_duration: u64,

    /// Pause between two rounds over all endpoints after every endpoint failed, in milliseconds.
    #[arg(long, default_value_t = PollerConfig::DEFAULT_RETRY_INTERVAL.as_millis() as u64)]
    pub retry_interval_ms: u64,

    /// Force the last irreversible block to at most this many blocks behind the head.
    #[arg(long, env = FORCE_FINALITY_AFTER_BLOCKS_ENV)]
    pub force_finality_after_blocks: Option<String>,

    /// Block type announced in the `FIRE INIT` line.
    #[arg(long, default_value = DEFAULT_BLOCK_TYPE)]
    pub block_type: String,

    /// Log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl PollerCommand {
    pub fn max_block_fetch_duration(&self) -> Duration {
        Duration::from_secs(self.max_block_fetch_duration)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::default()
            .with_retry_interval(Duration::from_millis(self.retry_interval_ms))
            .with_force_finality_after_blocks(
                self.force_finality_after_blocks
                    .as_deref()
                    .and_then(parse_force_finality_after_blocks),
            )
    }

    pub fn clients(&self) -> eyre::Result<Clients<HttpClient>> {
        let timeout = self.max_block_fetch_duration();
        let mut clients = Clients::new(timeout);
        for endpoint in &self.endpoints {
            clients.add(http_client(endpoint, timeout)?);
        }
        Ok(clients)
    }

    /// Polls until the stop block, or until `cancel` fires. Cancellation is a clean exit.
    pub async fn run(self, cancel: CancellationToken) -> eyre::Result<()> {
        let config = self.poller_config();
        info!(endpoints = ?self.endpoints, ?config, "Block poller configured");

        let handler = FireBlockHandler::new(std::io::stdout(), self.block_type.clone());
        let mut poller = BlockPoller::new(EthRpcFetcher::new(), handler, self.clients()?)
            .with_config(config)
            .with_cancellation(cancel);

        match poller.run(self.start_block, self.stop_block, self.fetch_batch_size).await {
            Ok(()) => {}
            Err(PollerError::Cancelled) => info!(stats = ?poller.stats(), "Block poller stopped"),
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Logs go to stderr; stdout carries the `FIRE` lines.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level(verbosity).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
