//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Configuration for the workflow execution engine.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of concurrent workflow executions.
    #[builder(default = "10")]
    pub max_concurrent_runs: usize,

    /// Maximum number of batch items a worker processes at once.
    #[builder(default = "8")]
    pub max_batch_concurrency: usize,

    /// Timeout for a whole workflow execution.
    #[builder(default = "Duration::from_secs(3600)")]
    pub default_timeout: Duration,

    /// Maximum number of retries for transient worker failures.
    #[builder(default = "3")]
    pub max_retries: u32,

    /// Delay between retries.
    #[builder(default = "Duration::from_secs(1)")]
    pub retry_delay: Duration,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_runs == Some(0) {
            return Err("max_concurrent_runs must be at least 1".into());
        }
        if self.max_batch_concurrency == Some(0) {
            return Err("max_batch_concurrency must be at least 1".into());
        }
        if self.default_timeout == Some(Duration::ZERO) {
            return Err("default_timeout must be positive".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 10,
            max_batch_concurrency: 8,
            default_timeout: Duration::from_secs(3600),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}
