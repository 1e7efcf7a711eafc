//! Site documents: the renderable form of a project.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::{sorted_blocks, Block};
use crate::nullable::or_default;
use crate::slug::slugify;
use crate::styles::StyleSettings;

/// A renderable site: ordered blocks, style settings and SEO metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDocument {
    /// Project identifier (used by the form handler)
    #[serde(default, deserialize_with = "or_default")]
    pub id: String,

    /// Site title
    #[serde(default, deserialize_with = "or_default")]
    pub title: String,

    /// Subdomain slug; derived from the title when empty
    #[serde(default, deserialize_with = "or_default")]
    pub slug: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Blocks in authored order
    #[serde(default, alias = "blocks", deserialize_with = "or_default")]
    pub content: Vec<Block>,

    #[serde(default, deserialize_with = "or_default")]
    pub styles: StyleSettings,

    #[serde(default)]
    pub seo_title: Option<String>,

    #[serde(default)]
    pub seo_description: Option<String>,

    #[serde(default)]
    pub favicon: Option<String>,

    /// Extra CSS appended after the generated stylesheet
    #[serde(default)]
    pub custom_css: Option<String>,
}

impl SiteDocument {
    /// Title shown in the browser tab.
    pub fn page_title(&self) -> &str {
        non_empty(&self.seo_title)
            .or_else(|| Some(self.title.as_str()).filter(|t| !t.trim().is_empty()))
            .unwrap_or("Untitled")
    }

    /// Text for the description meta tag.
    pub fn page_description(&self) -> &str {
        non_empty(&self.seo_description)
            .or_else(|| non_empty(&self.description))
            .unwrap_or("")
    }

    /// The slug to publish under.
    pub fn effective_slug(&self) -> String {
        if self.slug.trim().is_empty() {
            slugify(&self.title)
        } else {
            self.slug.clone()
        }
    }

    /// Blocks in render order.
    pub fn sorted_blocks(&self) -> Vec<&Block> {
        sorted_blocks(&self.content)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Errors that can occur when loading a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid site document: {0}")]
    InvalidJson(String),
}

/// Parse a site document from JSON.
pub fn parse_document(source: &str) -> Result<SiteDocument, DocumentError> {
    serde_json::from_str(source).map_err(|e| DocumentError::InvalidJson(e.to_string()))
}

/// Read and parse a site document from disk.
pub fn load_document(path: &Path) -> Result<SiteDocument, DocumentError> {
    let source = fs::read_to_string(path).map_err(|e| DocumentError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_document(&source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;

    #[test]
    fn parses_complete_document() {
        let source = r##"{
  "id": "p1",
  "title": "Bella Vista",
  "slug": "bella-vista",
  "content": [
    {"id": "h", "type": "hero", "props": {"title": "Bella Vista"}, "order": 0},
    {"id": "t", "type": "text", "props": {"content": "<p>Hi</p>"}, "order": 1}
  ],
  "styles": {"primaryColor": "#8B4513", "spacing": "comfortable"},
  "seoTitle": "Bella Vista | Fine Dining"
}"##;

        let doc = parse_document(source).unwrap();

        assert_eq!(doc.content.len(), 2);
        assert_eq!(doc.content[0].kind, BlockKind::Hero);
        assert_eq!(doc.styles.primary_color, "#8B4513");
        assert_eq!(doc.page_title(), "Bella Vista | Fine Dining");
        assert_eq!(doc.page_description(), "");
    }

    #[test]
    fn accepts_blocks_alias() {
        let doc = parse_document(r#"{"title":"x","blocks":[{"type":"spacer"}]}"#).unwrap();
        assert_eq!(doc.content.len(), 1);
    }

    #[test]
    fn null_fields_fall_back_to_defaults() {
        let doc = parse_document(
            r#"{"id":null,"title":null,"slug":null,"content":null,"styles":null,"seoTitle":null}"#,
        )
        .unwrap();

        assert_eq!(doc, SiteDocument::default());
        assert_eq!(doc.page_title(), "Untitled");
    }

    #[test]
    fn null_style_values_fall_back_to_defaults() {
        let doc = parse_document(r#"{"title":"A","styles":{"primaryColor":null}}"#).unwrap();

        assert_eq!(doc.title, "A");
        assert_eq!(doc.styles, StyleSettings::default());
    }

    #[test]
    fn null_block_props_are_empty() {
        let doc = parse_document(r#"{"content":[{"id":null,"type":"hero","props":null}]}"#).unwrap();

        assert_eq!(doc.content[0].id, "");
        assert!(doc.content[0].props.get("title").is_none());
    }

    #[test]
    fn falls_back_through_titles_and_descriptions() {
        let doc = SiteDocument {
            title: "Shop".to_string(),
            seo_title: Some("  ".to_string()),
            description: Some("Clothing".to_string()),
            ..Default::default()
        };

        assert_eq!(doc.page_title(), "Shop");
        assert_eq!(doc.page_description(), "Clothing");
        assert_eq!(doc.effective_slug(), "shop");
    }

    #[test]
    fn rejects_invalid_json() {
        let result = parse_document("{ not json");
        assert!(matches!(result, Err(DocumentError::InvalidJson(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let result = load_document(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(DocumentError::Read { .. })));
    }
}
