//! Sightgate CLI: moderate uploaded images.
//!
//! Reads configuration from the environment (see `AppConfig`), then runs every
//! named object (or the whole source container) through the pipeline and prints
//! one JSON line per object.

use anyhow::Context;
use clap::Parser;
use sightgate_cli::{init_tracing, OutcomeLine};
use sightgate_core::constants::{ACCEPTED_CONTAINER, REJECTED_CONTAINER};
use sightgate_core::AppConfig;
use sightgate_pipeline::ModerationPipeline;
use sightgate_storage::create_storage;
use sightgate_vision::VisionClient;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sightgate", about = "Route uploaded images by content classification")]
struct Cli {
    /// Object names in the source container; every object when omitted
    names: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    tracing::info!(
        environment = %config.environment,
        production = config.is_production(),
        source_container = %config.source_container,
        write_failure_policy = ?config.write_failure_policy,
        "Starting sightgate"
    );

    let containers = [
        config.source_container.as_str(),
        ACCEPTED_CONTAINER,
        REJECTED_CONTAINER,
    ];
    let storage = create_storage(&config.storage_connection, &containers)
        .await
        .context("Failed to initialize storage")?;
    let classifier = VisionClient::from_config(&config).context("Failed to create vision client")?;
    let pipeline = ModerationPipeline::from_config(&config, Arc::new(classifier), storage.clone());

    let names = if cli.names.is_empty() {
        storage
            .list(&config.source_container)
            .await
            .with_context(|| format!("Failed to list container {}", config.source_container))?
    } else {
        cli.names
    };

    let mut failed = 0usize;
    for name in &names {
        let result = pipeline.process(&config.source_container, name).await;
        if let Err(e) = &result {
            tracing::error!(name = %name, error = %e, "Moderation failed");
            failed += 1;
        }

        let line = OutcomeLine::from_result(name, &result);
        println!(
            "{}",
            serde_json::to_string(&line).context("Serialize outcome")?
        );
    }

    tracing::info!(processed = names.len(), failed, "Run finished");

    if failed > 0 {
        anyhow::bail!("{} of {} images failed moderation", failed, names.len());
    }
    Ok(())
}
