//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── command: Command            # schema | api | action | all
//! ├── convert: ConvertConfig      # Repository roots, segmentation, import rules
//! ├── rig: RigConfig              # Completion model, API keys, retries
//! ├── engine: EngineArgs          # Workflow concurrency, timeout, retries
//! └── telemetry: TelemetryArgs    # Log format
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//!
//! # Example
//!
//! ```bash
//! portage --backend ../backend --frontend ../frontend --dry-run all
//!
//! # Or via environment variables
//! PORTAGE_BACKEND=../backend PORTAGE_FRONTEND=../frontend portage schema
//! ```

mod engine;
mod telemetry;

use std::process;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
pub use engine::EngineArgs;
use portage_convert::{ConvertConfig, ConvertTarget};
use portage_rig::RigConfig;
use serde::{Deserialize, Serialize};
pub use telemetry::{LogFormat, TelemetryArgs};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "portage")]
#[command(about = "Ports a Python/FastAPI backend to a TypeScript/Next.js frontend")]
#[command(version)]
pub struct Cli {
    /// What to convert.
    #[command(subcommand)]
    pub command: Command,

    /// Repository roots and conversion settings.
    #[clap(flatten)]
    pub convert: ConvertConfig,

    /// Completion model configuration.
    #[clap(flatten)]
    pub rig: RigConfig,

    /// Workflow engine configuration.
    #[clap(flatten)]
    pub engine: EngineArgs,

    /// Log output configuration.
    #[clap(flatten)]
    pub telemetry: TelemetryArgs,
}

/// Conversion to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Converts `app/schemas` into `types`.
    Schema,
    /// Converts `app/api/v1/endpoints` into `lib/backend-api`.
    Api,
    /// Converts `lib/backend-api` into `actions/backend-api`.
    Action,
    /// Runs every conversion, actions built from the freshly generated clients.
    All,
}

impl Command {
    /// Converter target of this command.
    pub fn target(self) -> ConvertTarget {
        match self {
            Self::Schema => ConvertTarget::Schema,
            Self::Api => ConvertTarget::Api,
            Self::Action => ConvertTarget::Action,
            Self::All => ConvertTarget::All,
        }
    }
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` fallbacks see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.convert.backend.is_dir() {
            return Err(anyhow!(
                "backend root {} is not a directory",
                self.convert.backend.display()
            ));
        }
        if let Some(engine) = &self.convert.engine
            && !engine.is_dir()
        {
            return Err(anyhow!("engine root {} is not a directory", engine.display()));
        }
        if self.convert.max_lines_per_segment == 0 {
            return Err(anyhow!("max lines per segment must be at least 1"));
        }
        if self.convert.backend == self.convert.frontend {
            return Err(anyhow!("backend and frontend roots must differ"));
        }

        self.engine
            .engine_config()
            .context("invalid engine configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            command = ?self.command,
            backend = %self.convert.backend.display(),
            frontend = %self.convert.frontend.display(),
            engine = ?self.convert.engine,
            dry_run = self.convert.dry_run,
            api_dependencies = self.convert.api_dependencies,
            max_lines_per_segment = self.convert.max_lines_per_segment,
            "Conversion configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            model = %self.rig.model,
            temperature = ?self.rig.temperature,
            attempts = self.rig.attempts,
            max_batch_concurrency = self.engine.max_batch_concurrency,
            timeout_secs = self.engine.timeout,
            max_retries = self.engine.max_retries,
            "Model and engine configuration"
        );
    }

    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommand_and_flattened_groups() {
        let cli = Cli::try_parse_from([
            "portage",
            "--backend",
            "backend",
            "--frontend",
            "frontend",
            "--dry-run",
            "--engine-qualifiers",
            "ProjectPublicity,ProjectRole",
            "--max-batch-concurrency",
            "2",
            "api",
        ])
        .unwrap();

        assert_eq!(cli.command, Command::Api);
        assert_eq!(cli.command.target(), ConvertTarget::Api);
        assert!(cli.convert.dry_run);
        assert_eq!(cli.convert.engine_qualifiers, vec!["ProjectPublicity", "ProjectRole"]);
        assert_eq!(cli.engine.max_batch_concurrency, 2);
        assert_eq!(cli.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn requires_a_subcommand() {
        let result = Cli::try_parse_from(["portage", "--backend", "b", "--frontend", "f"]);
        assert!(result.is_err());
    }

    #[test]
    fn validation_rejects_missing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "portage",
            "--backend",
            dir.path().join("missing").to_str().unwrap(),
            "--frontend",
            dir.path().join("frontend").to_str().unwrap(),
            "schema",
        ])
        .unwrap();

        let error = cli.validate().unwrap_err();
        assert!(error.to_string().contains("is not a directory"));
    }

    #[test]
    fn validation_accepts_existing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "portage",
            "--backend",
            dir.path().to_str().unwrap(),
            "--frontend",
            dir.path().join("frontend").to_str().unwrap(),
            "all",
        ])
        .unwrap();

        cli.validate().unwrap();
    }
}
