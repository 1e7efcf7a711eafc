//! Initialize a siteforge project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use siteforge_blocks::{slugify, SiteDocument, TemplateCatalog};

use crate::config::Config;

/// Run the init command in the current directory.
pub async fn run(config: &Config, config_path: &Path, template: &str, yes: bool) -> Result<()> {
    tracing::info!("Initializing siteforge...");

    let catalog = config.catalog()?;
    let created = scaffold(Path::new("."), config_path, &catalog, template, yes)?;

    for path in &created {
        tracing::info!("Created {}", path.display());
    }
    tracing::info!("Initialization complete!");
    tracing::info!("Run 'siteforge preview sites/site.json' to start editing.");

    Ok(())
}

/// Write the config file and `sites/site.json` under `root`, returning the
/// files written. Existing files are kept unless `overwrite` is set.
fn scaffold(
    root: &Path,
    config_path: &Path,
    catalog: &TemplateCatalog,
    template_id: &str,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let template = catalog.get(template_id).with_context(|| {
        let ids: Vec<String> = catalog
            .list(&Default::default())
            .into_iter()
            .map(|t| t.id)
            .collect();
        format!("Unknown template '{}'. Available: {}", template_id, ids.join(", "))
    })?;

    let mut created = Vec::new();

    let config_file = root.join(config_path);
    if !config_file.exists() || overwrite {
        fs::write(&config_file, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_file.display()))?;
        created.push(config_file);
    } else {
        tracing::warn!("{} already exists. Use --yes to overwrite.", config_file.display());
    }

    let sites_dir = root.join("sites");
    fs::create_dir_all(&sites_dir).context("Failed to create sites directory")?;

    let site_file = sites_dir.join("site.json");
    if !site_file.exists() || overwrite {
        let doc = SiteDocument {
            title: template.title.clone(),
            slug: slugify(&template.title),
            description: Some(template.description.clone()).filter(|d| !d.is_empty()),
            content: template.content.clone(),
            styles: template.styles.clone(),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&doc).context("Failed to serialize site document")?;
        fs::write(&site_file, json)
            .with_context(|| format!("Failed to write {}", site_file.display()))?;
        created.push(site_file);
    } else {
        tracing::warn!("{} already exists. Use --yes to overwrite.", site_file.display());
    }

    Ok(created)
}

const DEFAULT_CONFIG: &str = r#"# SiteForge Configuration

[server]
host = "127.0.0.1"
port = 5000
cors_origin = "http://localhost:3000"

[database]
url = "sqlite://siteforge.db"

[storage]
# "local", "s3" or "memory". S3 credentials are read from
# S3_ACCESS_KEY and S3_SECRET_KEY.
backend = "local"
path = "storage"
# bucket = "my-sites"
# region = "us-east-1"
# endpoint = "http://localhost:9000"

[publish]
# Sites are published at https://<slug>.<domain>
domain = "sites.example.com"
form_endpoint = "/api/forms/submit"
minify = true

[jobs]
workers = 4
publish_attempts = 3
publish_backoff_ms = 2000
verify_delay_ms = 30000
verify_attempts = 10
verify_backoff_ms = 60000
ssl_delay_ms = 5000

[templates]
# dir = "templates"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use siteforge_blocks::load_document;
    use tempfile::tempdir;

    #[test]
    fn writes_config_and_starter_site() {
        let temp = tempdir().unwrap();
        let catalog = TemplateCatalog::builtin();

        let created = scaffold(
            temp.path(),
            Path::new("siteforge.toml"),
            &catalog,
            "restaurant-menu",
            false,
        )
        .unwrap();
        assert_eq!(created.len(), 2);

        let config = Config::load(&temp.path().join("siteforge.toml")).unwrap();
        assert_eq!(config.server.port, 5000);

        let doc = load_document(&temp.path().join("sites/site.json")).unwrap();
        let template = catalog.get("restaurant-menu").unwrap();
        assert_eq!(doc.title, template.title);
        assert_eq!(doc.content, template.content);
    }

    #[test]
    fn keeps_existing_files_without_overwrite() {
        let temp = tempdir().unwrap();
        let catalog = TemplateCatalog::builtin();
        fs::write(temp.path().join("siteforge.toml"), "[server]\nport = 9000\n").unwrap();

        let created = scaffold(temp.path(), Path::new("siteforge.toml"), &catalog, "blank", false).unwrap();

        assert_eq!(created, vec![temp.path().join("sites/site.json")]);
        let config = Config::load(&temp.path().join("siteforge.toml")).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn rejects_unknown_template() {
        let temp = tempdir().unwrap();

        let err = scaffold(
            temp.path(),
            Path::new("siteforge.toml"),
            &TemplateCatalog::builtin(),
            "nope",
            false,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Unknown template 'nope'"));
    }
}
