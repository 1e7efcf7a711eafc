//! Static site builder.
//!
//! Renders a directory of site documents into one folder per site.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use siteforge_blocks::{parse_document, SiteDocument};

use crate::renderer::{RenderConfig, SiteRenderer, DEFAULT_FORM_ENDPOINT};

/// Configuration for building a directory of sites.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory containing `*.json` site documents
    pub src_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Minify generated CSS
    pub minify: bool,

    /// Endpoint contact forms post to
    pub form_endpoint: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("sites"),
            output_dir: PathBuf::from("dist"),
            minify: true,
            form_endpoint: DEFAULT_FORM_ENDPOINT.to_string(),
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of sites generated
    pub sites: usize,

    /// Number of blocks rendered across all sites
    pub blocks: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read source directory: {0}")]
    ReadError(String),

    #[error("Failed to parse site document: {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Duplicate site slug '{slug}' in {first} and {second}")]
    DuplicateSlug {
        slug: String,
        first: String,
        second: String,
    },

    #[error("Failed to render {path}: {message}")]
    RenderError { path: String, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// A site to be built.
#[derive(Debug)]
struct SiteInfo {
    source_path: PathBuf,
    slug: String,
    doc: SiteDocument,
}

/// One entry of the `sites.json` manifest.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    slug: String,
    title: String,
    path: String,
    blocks: usize,
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
    renderer: SiteRenderer,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        let renderer = SiteRenderer::new(RenderConfig {
            minify: config.minify,
            form_endpoint: config.form_endpoint.clone(),
        });

        Self { config, renderer }
    }

    /// Build every site document under the source directory.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let sites = self.discover_sites()?;

        let results: Vec<Result<usize, BuildError>> =
            sites.par_iter().map(|site| self.build_site(site)).collect();

        let mut total_blocks = 0;
        for result in results {
            total_blocks += result?;
        }

        self.write_manifest(&sites)?;

        let duration = start.elapsed();

        Ok(BuildResult {
            sites: sites.len(),
            blocks: total_blocks,
            duration_ms: duration.as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Find and parse all site documents, rejecting slug collisions.
    fn discover_sites(&self) -> Result<Vec<SiteInfo>, BuildError> {
        if !self.config.src_dir.exists() {
            return Err(BuildError::ReadError(format!(
                "Source directory not found: {}",
                self.config.src_dir.display()
            )));
        }

        let mut sites = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for entry in WalkDir::new(&self.config.src_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

            let doc = parse_document(&content).map_err(|e| BuildError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            let slug = doc.effective_slug();
            if let Some(first) = seen.get(&slug) {
                return Err(BuildError::DuplicateSlug {
                    slug,
                    first: first.display().to_string(),
                    second: path.display().to_string(),
                });
            }
            seen.insert(slug.clone(), path.to_path_buf());

            sites.push(SiteInfo {
                source_path: path.to_path_buf(),
                slug,
                doc,
            });
        }

        Ok(sites)
    }

    /// Render a single site, returning the number of blocks it contains.
    fn build_site(&self, site: &SiteInfo) -> Result<usize, BuildError> {
        let output_path = self.config.output_dir.join(&site.slug).join("index.html");

        render_to_file(&self.renderer, &site.doc, &output_path).map_err(|e| match e {
            BuildError::RenderError { message, .. } => BuildError::RenderError {
                path: site.source_path.display().to_string(),
                message,
            },
            other => other,
        })?;

        tracing::debug!("Built {} -> {}", site.source_path.display(), output_path.display());

        Ok(site.doc.content.len())
    }

    fn write_manifest(&self, sites: &[SiteInfo]) -> Result<(), BuildError> {
        let manifest: Vec<ManifestEntry> = sites
            .iter()
            .map(|site| ManifestEntry {
                slug: site.slug.clone(),
                title: site.doc.page_title().to_string(),
                path: format!("{}/index.html", site.slug),
                blocks: site.doc.content.len(),
            })
            .collect();

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::write(self.config.output_dir.join("sites.json"), json)
            .map_err(|e| BuildError::WriteError(e.to_string()))
    }
}

/// Render one document and write it to `output_path`, creating parent folders.
pub fn render_to_file(
    renderer: &SiteRenderer,
    doc: &SiteDocument,
    output_path: &Path,
) -> Result<(), BuildError> {
    let html = renderer.render(doc).map_err(|e| BuildError::RenderError {
        path: output_path.display().to_string(),
        message: e.to_string(),
    })?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
    }

    fs::write(output_path, html).map_err(|e| BuildError::WriteError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_site(dir: &Path, file: &str, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file), json).unwrap();
    }

    #[test]
    fn builds_each_site_into_its_slug() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("sites");
        let out = temp.path().join("dist");

        write_site(
            &src,
            "cafe.json",
            r#"{"title": "Corner Cafe", "content": [{"type": "hero"}, {"type": "text"}]}"#,
        );
        write_site(
            &src,
            "studio.json",
            r#"{"title": "Studio", "slug": "my-studio", "content": [{"type": "spacer"}]}"#,
        );

        let builder = StaticBuilder::new(BuildConfig {
            src_dir: src,
            output_dir: out.clone(),
            ..Default::default()
        });
        let result = builder.build().unwrap();

        assert_eq!(result.sites, 2);
        assert_eq!(result.blocks, 3);
        assert!(out.join("corner-cafe/index.html").exists());
        assert!(out.join("my-studio/index.html").exists());

        let manifest = fs::read_to_string(out.join("sites.json")).unwrap();
        assert!(manifest.contains("\"slug\": \"corner-cafe\""));
        assert!(manifest.contains("\"title\": \"Studio\""));
    }

    #[test]
    fn ignores_non_json_files() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("sites");
        write_site(&src, "notes.txt", "not a site");
        write_site(&src, "a.json", r#"{"title": "A"}"#);

        let result = StaticBuilder::new(BuildConfig {
            src_dir: src,
            output_dir: temp.path().join("dist"),
            ..Default::default()
        })
        .build()
        .unwrap();

        assert_eq!(result.sites, 1);
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("sites");
        write_site(&src, "a.json", r#"{"title": "Same"}"#);
        write_site(&src, "b.json", r#"{"title": "Other", "slug": "same"}"#);

        let err = StaticBuilder::new(BuildConfig {
            src_dir: src,
            output_dir: temp.path().join("dist"),
            ..Default::default()
        })
        .build()
        .unwrap_err();

        assert!(matches!(err, BuildError::DuplicateSlug { ref slug, .. } if slug == "same"));
    }

    #[test]
    fn reports_malformed_documents() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("sites");
        write_site(&src, "broken.json", "{ nope");

        let err = StaticBuilder::new(BuildConfig {
            src_dir: src,
            output_dir: temp.path().join("dist"),
            ..Default::default()
        })
        .build()
        .unwrap_err();

        assert!(matches!(err, BuildError::ParseError { .. }));
    }

    #[test]
    fn missing_source_directory_is_an_error() {
        let temp = tempdir().unwrap();

        let err = StaticBuilder::new(BuildConfig {
            src_dir: temp.path().join("nowhere"),
            output_dir: temp.path().join("dist"),
            ..Default::default()
        })
        .build()
        .unwrap_err();

        assert!(matches!(err, BuildError::ReadError(_)));
    }

    #[test]
    fn render_to_file_creates_parents() {
        let temp = tempdir().unwrap();
        let output = temp.path().join("deep/nested/index.html");
        let doc = SiteDocument {
            title: "Solo".to_string(),
            ..Default::default()
        };

        render_to_file(&SiteRenderer::default(), &doc, &output).unwrap();

        let html = fs::read_to_string(output).unwrap();
        assert!(html.contains("<title>Solo</title>"));
    }
}
