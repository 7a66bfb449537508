use crate::block::FetchedBlock;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Turns "client + block number" into a block, a skip, or an error.
///
/// The returned future may be dropped at any point (attempt timeout or shutdown) and must not
/// leave work running behind it.
pub trait BlockFetcher<C>: Send + Sync {
    /// Best-effort probe of whether `number` is expected to exist upstream already. Used to bound
    /// look-ahead near the chain head.
    fn is_block_available(&self, number: u64) -> bool;

    fn fetch(&self, client: Arc<C>, number: u64) -> BoxFuture<'static, eyre::Result<FetchedBlock>>;
}

impl<C, F: BlockFetcher<C> + ?Sized> BlockFetcher<C> for Arc<F> {
    fn is_block_available(&self, number: u64) -> bool {
        self.as_ref().is_block_available(number)
    }

    fn fetch(&self, client: Arc<C>, number: u64) -> BoxFuture<'static, eyre::Result<FetchedBlock>> {
        self.as_ref().fetch(client, number)
    }
}
