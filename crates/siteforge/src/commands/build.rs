//! Static site build command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use siteforge_render::{BuildConfig, StaticBuilder};

use crate::config::Config;

/// Run the build command.
pub async fn run(config: &Config, src: PathBuf, output: PathBuf, minify: Option<bool>) -> Result<()> {
    tracing::info!("Building sites from {}...", src.display());

    let build_config = BuildConfig {
        src_dir: src,
        output_dir: output,
        minify: minify.unwrap_or(config.publish.minify),
        form_endpoint: config.publish.form_endpoint.clone(),
    };

    let result = tokio::task::spawn_blocking(move || StaticBuilder::new(build_config).build())
        .await
        .context("Build task panicked")??;

    tracing::info!(
        "Built {} sites with {} blocks in {}ms",
        result.sites,
        result.blocks,
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
