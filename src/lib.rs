pub mod block;
pub mod cli;
pub mod finality;
pub mod poller;
pub mod rpc;
pub mod sources;

pub use block::{Block, FetchedBlock};
