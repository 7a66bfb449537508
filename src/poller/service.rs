use super::{
    config::PollerConfig,
    error::{PollerError, Result},
    fetcher::BlockFetcher,
    handler::BlockHandler,
};
use crate::{
    block::{Block, FetchedBlock},
    finality::tweak_block_finality,
    rpc::{Clients, ClientsError},
};
use futures::StreamExt as _;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters kept for observability; they never drive control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub produced: u64,
    pub skipped: u64,
    /// Rounds in which every client failed.
    pub failed_rounds: u64,
}

/// A block number resolved by one of the clients, with the failed rounds it took to get there.
#[derive(Debug)]
struct Resolved {
    number: u64,
    fetched: FetchedBlock,
    failed_rounds: u64,
}

/// Polls blocks one number at a time from redundant clients and hands them to a
/// [`BlockHandler`] in strictly increasing order.
#[derive(Debug)]
pub struct BlockPoller<C, F, H> {
    fetcher: F,
    handler: H,
    clients: Clients<C>,
    config: PollerConfig,
    cancel: CancellationToken,
    stats: PollerStats,
    start_block: Option<Block>,
}

impl<C, F, H> BlockPoller<C, F, H>
where
    F: BlockFetcher<C>,
    H: BlockHandler,
{
    pub fn new(fetcher: F, handler: H, clients: Clients<C>) -> Self {
        Self {
            fetcher,
            handler,
            clients,
            config: PollerConfig::default(),
            cancel: CancellationToken::new(),
            stats: PollerStats::default(),
            start_block: None,
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts [`Self::run`] when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> PollerStats {
        self.stats
    }

    /// The block resolved by the seed fetch, if the start number was not skipped.
    pub fn start_block(&self) -> Option<&Block> {
        self.start_block.as_ref()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Polls from `start_block_num` until the cursor reaches `stop_block_num` (exclusive), or
    /// forever when no stop is given.
    ///
    /// `fetch_batch_size` bounds how many block numbers are in flight at once. With `1` the poller
    /// is strictly sequential; larger values prefetch numbers the fetcher reports as available
    /// while still releasing them to the handler in order.
    pub async fn run(
        &mut self,
        start_block_num: u64,
        stop_block_num: Option<u64>,
        fetch_batch_size: usize,
    ) -> Result<()> {
        if self.clients.is_empty() {
            return Err(PollerError::NoClients);
        }
        if fetch_batch_size == 0 {
            return Err(PollerError::InvalidBatchSize);
        }
        if stop_block_num.is_some_and(|stop| start_block_num >= stop) {
            info!(start_block_num, ?stop_block_num, "Empty block range, nothing to poll");
            return Ok(());
        }

        info!(
            start_block_num,
            ?stop_block_num,
            fetch_batch_size,
            clients = self.clients.len(),
            "Starting block poller"
        );
        self.handler.init().await.map_err(PollerError::Handler)?;

        let seed = self.resolve(start_block_num).await?;
        self.stats.failed_rounds += seed.failed_rounds;
        match seed.fetched {
            FetchedBlock::Block(block) => {
                info!(number = block.number, id = %block.id, "Resolved start block");
                self.start_block = Some(block);
            }
            FetchedBlock::Skipped => info!(start_block_num, "Start block is skipped"),
        }

        let mut next_block_num = start_block_num;
        loop {
            if stop_block_num.is_some_and(|stop| next_block_num >= stop) {
                info!(next_block_num, stats = ?self.stats, "Reached stop block");
                return Ok(());
            }
            next_block_num =
                self.poll_batch(next_block_num, stop_block_num, fetch_batch_size).await?;
        }
    }

    /// Block numbers to request together, starting at `next_block_num`. Numbers past the first
    /// are only included while the fetcher reports them available.
    fn batch_numbers(
        &self,
        next_block_num: u64,
        stop_block_num: Option<u64>,
        fetch_batch_size: usize,
    ) -> Vec<u64> {
        let mut numbers = Vec::with_capacity(fetch_batch_size);
        numbers.push(next_block_num);
        let mut candidate = next_block_num;
        while numbers.len() < fetch_batch_size {
            let Some(next) = candidate.checked_add(1) else { break };
            candidate = next;
            if stop_block_num.is_some_and(|stop| candidate >= stop)
                || !self.fetcher.is_block_available(candidate)
            {
                break;
            }
            numbers.push(candidate);
        }
        numbers
    }

    /// Resolves a batch and releases it to the handler in order. Returns the next cursor.
    async fn poll_batch(
        &mut self,
        next_block_num: u64,
        stop_block_num: Option<u64>,
        fetch_batch_size: usize,
    ) -> Result<u64> {
        let numbers = self.batch_numbers(next_block_num, stop_block_num, fetch_batch_size);
        let in_flight = numbers.len();

        let Self { fetcher, handler, clients, config, cancel, stats, .. } = self;
        let (fetcher, clients, config, cancel) = (&*fetcher, &*clients, &*config, &*cancel);

        let mut resolved = futures::stream::iter(numbers)
            .map(|number| resolve_block(clients, fetcher, config, cancel, number))
            .buffered(in_flight);

        let mut cursor = next_block_num;
        while let Some(result) = resolved.next().await {
            let Resolved { number, fetched, failed_rounds } = result?;
            if number != cursor {
                // A returned block jumped over prefetched numbers; they are stale.
                debug!(number, cursor, "Discarding prefetched block");
                break;
            }
            stats.failed_rounds += failed_rounds;

            match fetched {
                FetchedBlock::Block(mut block) => {
                    if let Some(distance) = config.force_finality_after_blocks {
                        tweak_block_finality(&mut block, distance);
                    }
                    cursor = successor(block.number)?;
                    debug!(
                        number = block.number,
                        id = %block.id,
                        lib = block.lib_num,
                        "Produced block"
                    );
                    handler.handle_block(block).await.map_err(PollerError::Handler)?;
                    stats.produced += 1;
                }
                FetchedBlock::Skipped => {
                    debug!(number, "Skipped block");
                    handler.handle_skipped(number).await.map_err(PollerError::Handler)?;
                    stats.skipped += 1;
                    cursor = successor(number)?;
                }
            }
        }

        Ok(cursor)
    }

    async fn resolve(&self, number: u64) -> Result<Resolved> {
        resolve_block(&self.clients, &self.fetcher, &self.config, &self.cancel, number).await
    }
}

/// Sweeps the clients for `number` until a round succeeds. Every round starts again from the
/// first client.
async fn resolve_block<C, F: BlockFetcher<C>>(
    clients: &Clients<C>,
    fetcher: &F,
    config: &PollerConfig,
    cancel: &CancellationToken,
    number: u64,
) -> Result<Resolved> {
    let mut failed_rounds = 0;
    loop {
        let round = clients.with_clients(|client| checked_fetch(fetcher, client, number));
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollerError::Cancelled),
            outcome = round => outcome,
        };

        match outcome {
            Ok(fetched) => return Ok(Resolved { number, fetched, failed_rounds }),
            Err(ClientsError::NoClients) => return Err(PollerError::NoClients),
            Err(err) => {
                failed_rounds += 1;
                warn!(block = number, round = failed_rounds, %err, "All clients failed, retrying");
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollerError::Cancelled),
            _ = tokio::time::sleep(config.retry_interval) => {}
        }
    }
}

/// Fetches `number` from one client, failing the attempt when the returned height is behind the
/// request or has no successor.
async fn checked_fetch<C, F: BlockFetcher<C>>(
    fetcher: &F,
    client: Arc<C>,
    number: u64,
) -> eyre::Result<FetchedBlock> {
    let fetched = fetcher.fetch(client, number).await?;
    if let FetchedBlock::Block(block) = &fetched {
        if block.number < number {
            return Err(eyre::eyre!("returned block {} behind requested {number}", block.number));
        }
        if block.number == u64::MAX {
            return Err(eyre::eyre!("returned block height {} is out of range", block.number));
        }
    }
    Ok(fetched)
}

fn successor(number: u64) -> Result<u64> {
    number.checked_add(1).ok_or(PollerError::HeightOverflow(number))
}
