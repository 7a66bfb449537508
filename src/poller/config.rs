use crate::finality::force_finality_after_blocks_from_env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Pause between two full rounds over the clients when every client failed.
    pub retry_interval: Duration,
    /// When set, `lib_num` of every produced block is forced to at most this many blocks behind.
    pub force_finality_after_blocks: Option<u64>,
}

impl PollerConfig {
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(25);

    /// Default config with the finality distance taken from the environment.
    pub fn from_env() -> Self {
        Self {
            force_finality_after_blocks: force_finality_after_blocks_from_env(),
            ..Self::default()
        }
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_force_finality_after_blocks(mut self, distance: Option<u64>) -> Self {
        self.force_finality_after_blocks = distance;
        self
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { retry_interval: Self::DEFAULT_RETRY_INTERVAL, force_finality_after_blocks: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finality::FORCE_FINALITY_AFTER_BLOCKS_ENV;

    #[test]
    fn test_from_env_reads_finality_distance() {
        std::env::set_var(FORCE_FINALITY_AFTER_BLOCKS_ENV, " 200 ");
        let config = PollerConfig::from_env();
        std::env::remove_var(FORCE_FINALITY_AFTER_BLOCKS_ENV);

        assert_eq!(config.force_finality_after_blocks, Some(200));
        assert_eq!(config.retry_interval, PollerConfig::DEFAULT_RETRY_INTERVAL);
    }
}
