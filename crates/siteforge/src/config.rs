//! `siteforge.toml` configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use siteforge_blocks::TemplateCatalog;
use siteforge_jobs::{JobOptions, StorageConfig};
use siteforge_render::{RenderConfig, DEFAULT_FORM_ENDPOINT};
use siteforge_server::ServerConfig;

/// Configuration file structure. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub publish: PublishConfig,
    pub jobs: JobsConfig,
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://siteforge.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Published sites live at `https://<slug>.<domain>`
    pub domain: String,
    pub form_endpoint: String,
    pub minify: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            domain: "sites.example.com".to_string(),
            form_endpoint: DEFAULT_FORM_ENDPOINT.to_string(),
            minify: true,
        }
    }
}

/// Queue sizing and retry schedule. Durations are milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub workers: usize,
    pub publish_attempts: u32,
    pub publish_backoff_ms: u64,
    pub verify_delay_ms: u64,
    pub verify_attempts: u32,
    pub verify_backoff_ms: u64,
    pub ssl_delay_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        let publish = JobOptions::publish();
        let verify = JobOptions::verify();
        Self {
            workers: 4,
            publish_attempts: publish.max_attempts,
            publish_backoff_ms: publish.backoff.as_millis() as u64,
            verify_delay_ms: verify.initial_delay.as_millis() as u64,
            verify_attempts: verify.max_attempts,
            verify_backoff_ms: verify.backoff.as_millis() as u64,
            ssl_delay_ms: 5000,
        }
    }
}

impl JobsConfig {
    pub fn publish_options(&self) -> JobOptions {
        JobOptions {
            max_attempts: self.publish_attempts.max(1),
            initial_delay: Duration::ZERO,
            backoff: Duration::from_millis(self.publish_backoff_ms),
        }
    }

    pub fn verify_options(&self) -> JobOptions {
        JobOptions {
            max_attempts: self.verify_attempts.max(1),
            initial_delay: Duration::from_millis(self.verify_delay_ms),
            backoff: Duration::from_millis(self.verify_backoff_ms),
        }
    }

    pub fn ssl_delay(&self) -> Duration {
        Duration::from_millis(self.ssl_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Extra templates added to the built-in catalog
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            minify: self.publish.minify,
            form_endpoint: self.publish.form_endpoint.clone(),
        }
    }

    /// Built-in templates plus any found in `[templates] dir`.
    pub fn catalog(&self) -> Result<TemplateCatalog> {
        let mut catalog = TemplateCatalog::builtin();
        if let Some(dir) = &self.templates.dir {
            let count = catalog
                .scan(dir)
                .with_context(|| format!("Failed to load templates from {}", dir.display()))?;
            tracing::info!("Loaded {} templates from {}", count, dir.display());
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use siteforge_jobs::StorageBackend;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_defaults() {
        let temp = tempdir().unwrap();

        let config = Config::load(&temp.path().join("siteforge.toml")).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.url, "sqlite://siteforge.db");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.jobs.verify_options(), JobOptions::verify());
        assert_eq!(config.jobs.publish_options(), JobOptions::publish());
    }

    #[test]
    fn reads_partial_sections() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("siteforge.toml");
        fs::write(
            &path,
            r#"
[server]
port = 8080

[storage]
backend = "memory"

[publish]
domain = "pages.test"
minify = false

[jobs]
verify_attempts = 3
verify_backoff_ms = 100
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.publish.domain, "pages.test");
        assert!(!config.render_config().minify);
        assert_eq!(config.publish.form_endpoint, DEFAULT_FORM_ENDPOINT);

        let verify = config.jobs.verify_options();
        assert_eq!(verify.max_attempts, 3);
        assert_eq!(verify.backoff, Duration::from_millis(100));
        assert_eq!(verify.initial_delay, Duration::from_secs(30));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("siteforge.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn loads_extra_templates() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("templates");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("law-firm.yaml"),
            "title: Law Firm\ncategory: business\nblocks:\n  - id: h\n    type: hero\n",
        )
        .unwrap();

        let config = Config {
            templates: TemplatesConfig { dir: Some(dir) },
            ..Default::default()
        };
        let catalog = config.catalog().unwrap();

        assert!(catalog.get("law-firm").is_some());
        assert!(catalog.get("blank").is_some());
    }
}
