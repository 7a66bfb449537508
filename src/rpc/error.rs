use std::time::Duration;
use thiserror::Error;

/// Why a single endpoint attempt failed.
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0:#}")]
    Failed(eyre::Report),
}

impl EndpointError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A failed attempt, tagged with the registration index of the endpoint that produced it.
#[derive(Error, Debug)]
#[error("client #{index}: {error}")]
pub struct EndpointFailure {
    pub index: usize,
    pub error: EndpointError,
}

#[derive(Error, Debug)]
pub enum ClientsError {
    #[error("no clients configured")]
    NoClients,

    #[error("all {} clients failed: {}", .0.len(), join_failures(.0))]
    AllFailed(Vec<EndpointFailure>),
}

impl ClientsError {
    /// Every endpoint failure of the round, in the order the endpoints were tried.
    pub fn failures(&self) -> &[EndpointFailure] {
        match self {
            Self::NoClients => &[],
            Self::AllFailed(failures) => failures,
        }
    }
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

pub type Result<T> = std::result::Result<T, ClientsError>;
