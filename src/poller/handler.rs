use crate::block::Block;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{future::BoxFuture, FutureExt};
use std::io::Write;
use tokio::sync::mpsc;
use tracing::debug;

/// Downstream consumer of polled blocks.
///
/// Calls arrive one at a time, in strictly increasing block number order, with exactly one of
/// `handle_block`/`handle_skipped` per number. The poller waits for each call to complete before
/// moving on.
pub trait BlockHandler: Send {
    fn init(&mut self) -> BoxFuture<'_, eyre::Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn handle_block(&mut self, block: Block) -> BoxFuture<'_, eyre::Result<()>>;

    fn handle_skipped(&mut self, number: u64) -> BoxFuture<'_, eyre::Result<()>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolledBlock {
    Block(Block),
    Skipped(u64),
}

impl PolledBlock {
    pub fn number(&self) -> u64 {
        match self {
            Self::Block(block) => block.number,
            Self::Skipped(number) => *number,
        }
    }
}

/// Forwards polled blocks into a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelBlockHandler {
    block_tx: mpsc::Sender<PolledBlock>,
}

impl ChannelBlockHandler {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PolledBlock>) {
        let (block_tx, block_rx) = mpsc::channel(capacity);
        (Self { block_tx }, block_rx)
    }

    async fn send(&self, polled: PolledBlock) -> eyre::Result<()> {
        self.block_tx.send(polled).await.map_err(|_| eyre::eyre!("Block receiver dropped"))
    }
}

impl BlockHandler for ChannelBlockHandler {
    fn handle_block(&mut self, block: Block) -> BoxFuture<'_, eyre::Result<()>> {
        self.send(PolledBlock::Block(block)).boxed()
    }

    fn handle_skipped(&mut self, number: u64) -> BoxFuture<'_, eyre::Result<()>> {
        self.send(PolledBlock::Skipped(number)).boxed()
    }
}

/// Writes the Firehose console reader protocol:
///
/// ```text
/// FIRE INIT 3.0 <block type>
/// FIRE BLOCK <num> <id> <parent num> <parent id> <lib num> <timestamp nanos> <base64 payload>
/// ```
#[derive(Debug)]
pub struct FireBlockHandler<W> {
    out: W,
    block_type: String,
}

impl<W: Write + Send> FireBlockHandler<W> {
    pub const PROTOCOL_VERSION: &'static str = "3.0";

    pub fn new(out: W, block_type: impl Into<String>) -> Self {
        Self { out, block_type: block_type.into() }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: String) -> eyre::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn fire_block_line(block: &Block) -> String {
    format!(
        "FIRE BLOCK {} {} {} {} {} {} {}",
        block.number,
        block.id,
        block.parent_num,
        block.parent_id,
        block.lib_num,
        block.timestamp.saturating_mul(1_000_000_000),
        STANDARD.encode(&block.payload),
    )
}

impl<W: Write + Send> BlockHandler for FireBlockHandler<W> {
    fn init(&mut self) -> BoxFuture<'_, eyre::Result<()>> {
        let line = format!("FIRE INIT {} {}", Self::PROTOCOL_VERSION, self.block_type);
        async move { self.write_line(line) }.boxed()
    }

    fn handle_block(&mut self, block: Block) -> BoxFuture<'_, eyre::Result<()>> {
        async move { self.write_line(fire_block_line(&block)) }.boxed()
    }

    fn handle_skipped(&mut self, number: u64) -> BoxFuture<'_, eyre::Result<()>> {
        debug!(block = number, "Skipped block, nothing to emit");
        async { Ok(()) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Block {
        Block {
            number: 100,
            id: "aa".to_string(),
            parent_num: 99,
            parent_id: "bb".to_string(),
            lib_num: 90,
            timestamp: 2,
            payload: vec![1u8, 2, 3].into(),
        }
    }

    #[tokio::test]
    async fn test_fire_handler_lines() {
        let mut handler = FireBlockHandler::new(Vec::new(), "sf.ethereum.type.v2.Block");
        handler.init().await.unwrap();
        handler.handle_block(block()).await.unwrap();
        handler.handle_skipped(101).await.unwrap();

        let out = String::from_utf8(handler.into_inner()).unwrap();
        assert_eq!(
            out,
            "FIRE INIT 3.0 sf.ethereum.type.v2.Block\n\
             FIRE BLOCK 100 aa 99 bb 90 2000000000 AQID\n"
        );
    }

    #[tokio::test]
    async fn test_channel_handler_forwards_in_order() {
        let (mut handler, mut block_rx) = ChannelBlockHandler::new(4);
        handler.handle_block(block()).await.unwrap();
        handler.handle_skipped(101).await.unwrap();

        assert_eq!(block_rx.recv().await, Some(PolledBlock::Block(block())));
        assert_eq!(block_rx.recv().await, Some(PolledBlock::Skipped(101)));
    }

    #[tokio::test]
    async fn test_channel_handler_fails_when_receiver_dropped() {
        let (mut handler, block_rx) = ChannelBlockHandler::new(1);
        drop(block_rx);
        assert!(handler.handle_skipped(1).await.is_err());
    }
}
