//! Sequential block poller with multi-client failover
//!
//! The poller resolves one block number at a time through [`Clients`](crate::rpc::Clients),
//! retrying full rounds until some client answers, and hands the results to a [`BlockHandler`]
//! in strictly increasing order.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod handler;
pub mod service;

pub use config::*;
pub use error::PollerError;
pub use fetcher::*;
pub use handler::*;
pub use service::*;

/// Re-export commonly used types
pub mod prelude {
    pub use super::{
        config::PollerConfig,
        fetcher::BlockFetcher,
        handler::{BlockHandler, ChannelBlockHandler, FireBlockHandler, PolledBlock},
        service::{BlockPoller, PollerStats},
    };
    pub use crate::{
        block::{Block, FetchedBlock},
        rpc::Clients,
    };
}
