//! Block and site document model for siteforge.
//!
//! A site is an ordered list of typed blocks, each carrying a free-form
//! property bag, plus style settings and SEO metadata. This crate parses those
//! documents, provides lenient typed access to block properties, and holds the
//! catalog of starter templates.

pub mod block;
pub mod catalog;
pub mod document;
mod nullable;
pub mod props;
pub mod slug;
pub mod styles;

pub use block::{sorted_blocks, Block, BlockKind};
pub use catalog::{CatalogError, CategoryCount, Template, TemplateCatalog, TemplateFilter, TemplateSummary};
pub use document::{load_document, parse_document, DocumentError, SiteDocument};
pub use props::{format_number, Props};
pub use slug::{is_valid_slug, slugify};
pub use styles::{Spacing, StyleSettings};
