//! Template catalog.
//!
//! Holds the built-in starter templates and any extra templates loaded from a
//! directory of JSON or YAML files. New projects clone a template's blocks and
//! styles at creation time.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::block::Block;
use crate::styles::StyleSettings;

/// A pre-authored starting point for a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,

    #[serde(alias = "name")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Preview image URL
    #[serde(default, alias = "preview")]
    pub thumbnail: Option<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Blocks cloned into new projects
    #[serde(default, alias = "blocks")]
    pub content: Vec<Block>,

    #[serde(default)]
    pub styles: StyleSettings,
}

fn default_category() -> String {
    "business".to_string()
}

impl Template {
    /// Listing view without the block content.
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail: self.thumbnail.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
        }
    }

    fn matches(&self, filter: &TemplateFilter) -> bool {
        if let Some(category) = filter.category.as_deref() {
            if category != "all" && !category.is_empty() && self.category != category {
                return false;
            }
        }

        match filter.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => {
                let needle = search.to_lowercase();
                self.title.to_lowercase().contains(&needle)
                    || self.description.to_lowercase().contains(&needle)
                    || self.tags.iter().any(|t| t.to_lowercase() == needle)
            }
            _ => true,
        }
    }
}

/// Template listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
}

/// Catalog query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFilter {
    /// Category name; `"all"` disables the filter
    pub category: Option<String>,

    /// Case-insensitive match on title or description, exact match on a tag
    pub search: Option<String>,
}

/// Number of templates in a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// A catalog of templates keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

impl TemplateCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The templates that ship with siteforge.
    pub fn builtin() -> Self {
        let templates: Vec<Template> =
            serde_yaml::from_str(BUILTIN_TEMPLATES).expect("built-in templates are valid YAML");
        Self { templates }
    }

    /// Add or replace a template (matched by id).
    pub fn insert(&mut self, template: Template) {
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    /// Load templates from `*.json`, `*.yaml` and `*.yml` files under `dir`.
    ///
    /// A file may hold a single template or a list. Templates without an id
    /// take the file stem. Unreadable or malformed files are skipped.
    pub fn scan(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        if !dir.exists() {
            return Err(CatalogError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut count = 0;

        for entry in WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !matches!(ext, "json" | "yaml" | "yml") {
                continue;
            }

            let source = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Skipping template {}: {}", path.display(), e);
                    continue;
                }
            };

            let parsed = match parse_templates(&source, ext) {
                Ok(templates) => templates,
                Err(e) => {
                    tracing::warn!("Skipping template {}: {}", path.display(), e);
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("template")
                .to_string();

            for mut template in parsed {
                if template.id.is_empty() {
                    template.id = stem.clone();
                }
                self.insert(template);
                count += 1;
            }
        }

        Ok(count)
    }

    /// Look up a template by id.
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Summaries of the templates matching `filter`, in catalog order.
    pub fn list(&self, filter: &TemplateFilter) -> Vec<TemplateSummary> {
        self.templates
            .iter()
            .filter(|t| t.matches(filter))
            .map(Template::summary)
            .collect()
    }

    /// Template counts per category, sorted by category name.
    pub fn categories(&self) -> Vec<CategoryCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for template in &self.templates {
            *counts.entry(template.category.as_str()).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(name, count)| CategoryCount {
                name: name.to_string(),
                count,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Template>),
    One(Box<Template>),
}

fn parse_templates(source: &str, ext: &str) -> Result<Vec<Template>, CatalogError> {
    let parsed: OneOrMany = if ext == "json" {
        serde_json::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))?
    } else {
        serde_yaml::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))?
    };

    Ok(match parsed {
        OneOrMany::Many(templates) => templates,
        OneOrMany::One(template) => vec![*template],
    })
}

/// Errors that can occur with the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Templates directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Failed to parse template: {0}")]
    Parse(String),
}

const BUILTIN_TEMPLATES: &str = r##"
- id: blank
  title: Blank Canvas
  description: Start from scratch with a clean slate
  thumbnail: /template-previews/blank.png
  category: business
  tags: [minimal, custom]
  content: []

- id: modern-portfolio
  title: Modern Portfolio
  description: Clean and professional portfolio template perfect for showcasing your work
  thumbnail: /modern-portfolio-website.png
  category: portfolio
  tags: [portfolio, professional, developer]
  styles: { primaryColor: "#0066FF", fontFamily: Inter, spacing: normal }
  content:
    - id: hero-1
      type: hero
      order: 0
      props:
        title: John Doe
        subtitle: Full Stack Developer
        description: Creating beautiful and functional web experiences
        buttonText: View My Work
        buttonLink: "#portfolio"
        backgroundImage: /placeholder.svg?height=600&width=1200&query=developer+workspace
    - id: text-1
      type: text
      order: 1
      props:
        content: "<h2>About Me</h2><p>I'm a passionate developer with 5+ years of experience building web applications.</p>"

- id: business-landing
  title: Business Landing
  description: Professional business landing page with call-to-action sections
  thumbnail: /business-landing-page.png
  category: business
  tags: [business, corporate, landing]
  styles: { primaryColor: "#00C2A8", fontFamily: Inter, spacing: comfortable }
  content:
    - id: hero-2
      type: hero
      order: 0
      props:
        title: Grow Your Business
        subtitle: Professional Solutions
        description: We help businesses scale with innovative technology solutions
        buttonText: Get Started
        buttonLink: "#contact"
    - id: contact-2
      type: contact
      order: 1
      props:
        title: Talk to Us
        fields: [name, email, phone, message]

- id: creative-agency
  title: Creative Agency
  description: Bold and creative template for design agencies and studios
  thumbnail: /creative-agency-website.png
  category: creative
  tags: [creative, agency, design]
  styles: { primaryColor: "#FF6B6B", fontFamily: Inter, spacing: tight }
  content:
    - id: hero-3
      type: hero
      order: 0
      props:
        title: Creative Studio
        subtitle: Design & Innovation
        description: We create stunning visual experiences that captivate audiences
        buttonText: See Our Work
        buttonLink: "#portfolio"
    - id: columns-3
      type: columns
      order: 1
      props:
        columns: 3
        content:
          - content: Branding
          - content: Web Design
          - content: Motion

- id: restaurant-menu
  title: Restaurant Menu
  description: Elegant restaurant template with menu showcase and booking
  thumbnail: /restaurant-menu-website.jpg
  category: restaurant
  tags: [restaurant, food, menu]
  styles: { primaryColor: "#8B4513", fontFamily: Inter, spacing: normal }
  content:
    - id: hero-4
      type: hero
      order: 0
      props:
        title: Bella Vista
        subtitle: Fine Dining Experience
        description: Authentic Italian cuisine in the heart of the city
        buttonText: Make Reservation
        buttonLink: "#booking"
    - id: form-4
      type: form
      order: 1
      props:
        title: Book a Table
        description: We'll confirm your reservation by email
        buttonText: Request Booking

- id: ecommerce-store
  title: E-commerce Store
  description: Modern online store template with product showcase
  thumbnail: /ecommerce-store-website.jpg
  category: ecommerce
  tags: [ecommerce, store, fashion]
  styles: { primaryColor: "#000000", fontFamily: Inter, spacing: normal }
  content:
    - id: hero-5
      type: hero
      order: 0
      props:
        title: Fashion Forward
        subtitle: Premium Clothing
        description: Discover the latest trends in fashion and style
        buttonText: Shop Now
        buttonLink: "#products"
    - id: image-5
      type: image
      order: 1
      props:
        src: /placeholder.svg?height=400&width=800&query=fashion+collection
        alt: New collection
        caption: The autumn collection

- id: personal-blog
  title: Personal Blog
  description: Clean and minimal blog template for writers and content creators
  thumbnail: /personal-blog-website.png
  category: blog
  tags: [blog, personal, writing]
  styles: { primaryColor: "#6366F1", fontFamily: Inter, spacing: comfortable }
  content:
    - id: hero-6
      type: hero
      order: 0
      props:
        title: My Journey
        subtitle: Personal Blog
        description: Sharing thoughts, experiences, and insights about life and technology
        buttonText: Read Articles
        buttonLink: "#blog"
    - id: text-6
      type: text
      order: 1
      props:
        content: "<h2>Latest posts</h2><p>New writing every week.</p>"
        textAlign: center
"##;
