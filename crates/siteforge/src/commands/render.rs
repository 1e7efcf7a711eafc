//! Render a single site document.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use siteforge_blocks::load_document;
use siteforge_render::{render_to_file, SiteRenderer};

use crate::config::Config;

/// Run the render command. Without `output` the page goes to stdout.
pub async fn run(config: &Config, file: &Path, output: Option<&Path>) -> Result<()> {
    let doc = load_document(file)?;
    let renderer = SiteRenderer::new(config.render_config());

    match output {
        Some(path) => {
            render_to_file(&renderer, &doc, path)?;
            tracing::info!("Rendered {} to {}", file.display(), path.display());
        }
        None => {
            let html = renderer
                .render(&doc)
                .with_context(|| format!("Failed to render {}", file.display()))?;
            std::io::stdout()
                .write_all(html.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}
