//! Workflow engine configuration.

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use portage_runtime::prelude::{EngineConfig, EngineConfigBuilder};
use serde::{Deserialize, Serialize};

/// Workflow engine options.
///
/// # Environment Variables
///
/// - `PORTAGE_MAX_BATCH_CONCURRENCY` - Batch items converted at once (default: 8)
/// - `PORTAGE_TIMEOUT` - Timeout of the whole run in seconds (default: 3600)
/// - `PORTAGE_MAX_RETRIES` - Retries of a failed worker (default: 3)
/// - `PORTAGE_RETRY_DELAY_MS` - Delay between retries in milliseconds (default: 1000)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct EngineArgs {
    /// Maximum number of batch items a worker processes at once.
    ///
    /// Bounds the number of concurrent LLM requests of one converter.
    #[arg(long, env = "PORTAGE_MAX_BATCH_CONCURRENCY", default_value_t = 8)]
    pub max_batch_concurrency: usize,

    /// Timeout of the whole run in seconds.
    #[arg(long, env = "PORTAGE_TIMEOUT", default_value_t = 3600)]
    pub timeout: u64,

    /// Retries of a failed worker before the run fails.
    #[arg(long, env = "PORTAGE_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Delay between retries in milliseconds.
    #[arg(long, env = "PORTAGE_RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,
}

impl EngineArgs {
    /// Builds the engine configuration.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        EngineConfigBuilder::default()
            .max_batch_concurrency(self.max_batch_concurrency)
            .default_timeout(Duration::from_secs(self.timeout))
            .max_retries(self.max_retries)
            .retry_delay(Duration::from_millis(self.retry_delay_ms))
            .build()
            .context("failed to build engine configuration")
    }
}

impl Default for EngineArgs {
    fn default() -> Self {
        Self {
            max_batch_concurrency: 8,
            timeout: 3600,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_engine_config() {
        let args = EngineArgs {
            timeout: 60,
            retry_delay_ms: 250,
            ..EngineArgs::default()
        };
        let config = args.engine_config().unwrap();
        assert_eq!(config.default_timeout, Duration::from_secs(60));
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.max_batch_concurrency, 8);
    }

    #[test]
    fn rejects_zero_timeout() {
        let args = EngineArgs {
            timeout: 0,
            ..EngineArgs::default()
        };
        assert!(args.engine_config().is_err());
    }
}
