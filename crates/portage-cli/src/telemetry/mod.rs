//! Telemetry and tracing configuration.

mod tracing;

use anyhow::Context;

use crate::config::TelemetryArgs;

/// Initializes the tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber fails to initialize.
pub(crate) fn init_tracing(args: &TelemetryArgs) -> anyhow::Result<()> {
    tracing::init_tracing(args.log_format).context("Failed to initialize tracing")
}
