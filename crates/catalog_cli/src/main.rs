//! Command-line entry point: log in, walk to the product catalog, harvest every
//! row and write them to a JSON file.
mod config;

use std::process::ExitCode;

use anyhow::Context;
use catalog_engine::{ChromiumHost, FileSessionStore, RunSummary};
use catalog_logging::{catalog_error, catalog_info};

use crate::config::AppConfig;

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            catalog_logging::initialize(
                catalog_logging::LogDestination::Terminal,
                catalog_logging::LevelFilter::Info,
            );
            catalog_error!("Configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    catalog_logging::initialize(config.log_destination(), config.log_level);

    match run(&config) {
        Ok(summary) => {
            catalog_info!(
                "Saved {} products to {} ({} pages{})",
                summary.records,
                summary.output.display(),
                summary.pages,
                if summary.session_reused {
                    ", stored session reused"
                } else {
                    ""
                }
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            catalog_error!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> anyhow::Result<RunSummary> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(async {
        let host = ChromiumHost::launch(&config.browser_settings())
            .await
            .context("failed to launch the browser")?;
        let store = FileSessionStore::new(&config.session_file);
        let summary = catalog_engine::run(Box::new(host), &store, &config.run_settings()).await?;
        Ok(summary)
    })
}
