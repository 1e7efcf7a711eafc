//! Static page renderer for siteforge.
//!
//! Turns an ordered list of typed blocks plus style settings into a single
//! standalone HTML page, and builds whole directories of site documents.

pub mod assets;
pub mod builder;
pub mod renderer;
pub mod templates;

pub use builder::{render_to_file, BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use renderer::{RenderConfig, RenderError, SiteRenderer, DEFAULT_FORM_ENDPOINT};
