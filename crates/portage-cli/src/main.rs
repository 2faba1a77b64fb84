#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod summary;
mod telemetry;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use portage_convert::{ConvertContext, ProjectConverter};
use portage_runtime::prelude::Engine;

use crate::config::Cli;
use crate::summary::RunSummary;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "portage_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "portage_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "portage_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "conversion completed successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = format!("{error:#}"),
            "conversion failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(&cli.telemetry)?;
    cli.log();
    cli.validate()?;

    let target = cli.command.target();
    let engine = Engine::new(cli.engine.engine_config()?);
    let converter = create_converter(&cli, engine).await?;

    let report = converter
        .convert(target, &cli.convert.layout())
        .await
        .with_context(|| format!("{target} conversion failed"))?;

    let summary = RunSummary::new(target, cli.convert.dry_run, &report);
    let summary = serde_json::to_string_pretty(&summary).context("failed to serialize run summary")?;
    println!("{summary}");

    Ok(())
}

/// Creates the converter from the model and conversion configuration.
async fn create_converter(cli: &Cli, engine: Engine) -> anyhow::Result<ProjectConverter> {
    let provider = cli
        .rig
        .completion_provider()
        .await
        .context("failed to create completion provider")?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        model = %cli.rig.model,
        "completion provider ready"
    );

    let structured = cli.rig.structured_output(Arc::new(provider));
    let context = ConvertContext::new(structured, cli.convert.options());
    Ok(ProjectConverter::new(engine, context))
}
