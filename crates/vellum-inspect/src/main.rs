//! vellum-inspect - read-only inspector binary.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vellum_core::{VellumConfig, VersionedStore};
use vellum_tables::TableFactory;

use crate::cli::Cli;
use crate::commands::Inspector;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VellumConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => VellumConfig::from_env().context("loading config from environment")?,
    };
    config.validate()?;

    let table = TableFactory::create(&config.table)
        .await
        .context("opening table backend")?;
    tracing::debug!(table = table.table_name(), "inspecting table");

    let inspector = Inspector::new(VersionedStore::new(table), config.page_size);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    inspector.run(cli.cmd, &mut out).await?;
    out.flush()?;
    Ok(())
}
