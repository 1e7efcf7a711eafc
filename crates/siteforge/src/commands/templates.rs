//! List the template catalog.

use anyhow::Result;
use siteforge_blocks::TemplateFilter;

use crate::config::Config;

/// Run the templates command.
pub async fn run(config: &Config, category: Option<String>) -> Result<()> {
    let catalog = config.catalog()?;
    let templates = catalog.list(&TemplateFilter {
        category,
        search: None,
    });

    if templates.is_empty() {
        tracing::warn!("No templates found");
        return Ok(());
    }

    let width = templates.iter().map(|t| t.id.len()).max().unwrap_or(0);
    for template in &templates {
        println!(
            "{:width$}  {:12}  {}",
            template.id,
            template.category,
            template.title,
            width = width
        );
    }

    Ok(())
}
