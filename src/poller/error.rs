use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollerError {
    #[error("no clients configured")]
    NoClients,

    #[error("fetch batch size must be at least 1")]
    InvalidBatchSize,

    #[error("block handler error: {0:#}")]
    Handler(eyre::Report),

    #[error("block {0} has no successor")]
    HeightOverflow(u64),

    #[error("poller cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PollerError>;
