//! Live preview command.

use std::path::PathBuf;

use anyhow::Result;
use siteforge_render::SiteRenderer;
use siteforge_server::{PreviewConfig, PreviewServer};

use crate::config::Config;

/// Run the preview server for one document.
pub async fn run(config: &Config, file: PathBuf, port: u16, open: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!(
            "File not found: {}. Run 'siteforge init' to create one.",
            file.display()
        );
    }

    let preview_config = PreviewConfig {
        file,
        port,
        open,
        ..Default::default()
    };
    let renderer = SiteRenderer::new(config.render_config());

    PreviewServer::new(preview_config, renderer).start().await?;

    Ok(())
}
