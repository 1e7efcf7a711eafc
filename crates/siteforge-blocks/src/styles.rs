//! Site-wide style settings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::nullable::{non_empty_string, or_default};

/// Default accent color.
pub const DEFAULT_PRIMARY_COLOR: &str = "#0066FF";

/// Default font stack.
pub const DEFAULT_FONT_FAMILY: &str = "Inter, -apple-system, BlinkMacSystemFont, sans-serif";

/// Vertical rhythm of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Spacing {
    Tight,
    #[default]
    Normal,
    Comfortable,
}

impl Spacing {
    /// CSS length used for the `--spacing` variable.
    pub fn css_value(&self) -> &'static str {
        match self {
            Self::Tight => "0.5rem",
            Self::Normal => "1rem",
            Self::Comfortable => "1.5rem",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tight => "tight",
            Self::Normal => "normal",
            Self::Comfortable => "comfortable",
        }
    }
}

impl From<String> for Spacing {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tight" => Self::Tight,
            "comfortable" => Self::Comfortable,
            _ => Self::Normal,
        }
    }
}

impl From<Spacing> for String {
    fn from(spacing: Spacing) -> Self {
        spacing.name().to_string()
    }
}

/// Style settings applied to the whole page.
///
/// Keys the renderer does not use are kept in `extra` so they survive a
/// load/save cycle through the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSettings {
    #[serde(default = "default_primary_color", deserialize_with = "primary_color_or_default")]
    pub primary_color: String,

    #[serde(default = "default_font_family", deserialize_with = "font_family_or_default")]
    pub font_family: String,

    #[serde(default, deserialize_with = "or_default")]
    pub spacing: Spacing,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_primary_color() -> String {
    DEFAULT_PRIMARY_COLOR.to_string()
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn primary_color_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(non_empty_string(deserializer)?.unwrap_or_else(default_primary_color))
}

fn font_family_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(non_empty_string(deserializer)?.unwrap_or_else(default_font_family))
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            primary_color: default_primary_color(),
            font_family: default_font_family(),
            spacing: Spacing::default(),
            extra: Map::new(),
        }
    }
}
