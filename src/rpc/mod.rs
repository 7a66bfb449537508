//! Ordered set of redundant upstream clients with single-round failover.
//!
//! Every dispatch walks the clients from the first registered one, so the primary endpoint is
//! always preferred and alternates are only used when it fails for that particular call.

mod error;

pub use error::*;

use std::{future::Future, sync::Arc, time::Duration};
use tracing::trace;

#[derive(Debug)]
pub struct Clients<C> {
    clients: Vec<Arc<C>>,
    max_block_fetch_duration: Duration,
}

impl<C> Clients<C> {
    pub fn new(max_block_fetch_duration: Duration) -> Self {
        Self { clients: Vec::new(), max_block_fetch_duration }
    }

    pub fn add(&mut self, client: C) {
        self.clients.push(Arc::new(client));
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn max_block_fetch_duration(&self) -> Duration {
        self.max_block_fetch_duration
    }

    /// Runs `f` against each client in registration order until one succeeds.
    ///
    /// Each attempt is bounded by `max_block_fetch_duration`; an attempt that runs over is
    /// dropped and recorded as [`EndpointError::Timeout`]. When every client fails, the returned
    /// [`ClientsError::AllFailed`] carries one entry per client.
    pub async fn with_clients<V, F, Fut>(&self, f: F) -> Result<V>
    where
        F: Fn(Arc<C>) -> Fut,
        Fut: Future<Output = eyre::Result<V>>,
    {
        if self.clients.is_empty() {
            return Err(ClientsError::NoClients);
        }

        let mut failures = Vec::with_capacity(self.clients.len());
        for (index, client) in self.clients.iter().enumerate() {
            let attempt = tokio::time::timeout(self.max_block_fetch_duration, f(client.clone()));
            let error = match attempt.await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => EndpointError::Failed(err),
                Err(_) => EndpointError::Timeout(self.max_block_fetch_duration),
            };
            trace!(client = index, %error, "Client attempt failed");
            failures.push(EndpointFailure { index, error });
        }

        Err(ClientsError::AllFailed(failures))
    }
}

impl<C> Clone for Clients<C> {
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            max_block_fetch_duration: self.max_block_fetch_duration,
        }
    }
}
