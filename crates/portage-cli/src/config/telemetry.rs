//! Log output configuration.

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

/// Format of the log lines written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, colored output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Log output options.
///
/// The log level is read from `RUST_LOG` and defaults to `info`.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct TelemetryArgs {
    /// Format of the log lines.
    #[arg(long, env = "PORTAGE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    #[serde(default)]
    pub log_format: LogFormat,
}
