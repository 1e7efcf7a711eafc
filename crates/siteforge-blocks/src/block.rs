//! Typed content blocks.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::props::Props;

/// The kind of a block.
///
/// Unrecognised type names are preserved so they can be reported back to the
/// author instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Hero,
    Text,
    Button,
    Image,
    Video,
    Contact,
    Spacer,
    Columns,
    Form,
    Unknown(String),
}

impl BlockKind {
    /// Every kind the renderer knows, in palette order.
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Hero,
        BlockKind::Text,
        BlockKind::Button,
        BlockKind::Image,
        BlockKind::Video,
        BlockKind::Contact,
        BlockKind::Spacer,
        BlockKind::Columns,
        BlockKind::Form,
    ];

    /// Parse a type name as stored in documents.
    pub fn from_name(name: &str) -> Self {
        match name {
            "hero" => Self::Hero,
            "text" => Self::Text,
            "button" => Self::Button,
            "image" => Self::Image,
            "video" => Self::Video,
            "contact" => Self::Contact,
            "spacer" => Self::Spacer,
            "columns" => Self::Columns,
            "form" => Self::Form,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The stored type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Hero => "hero",
            Self::Text => "text",
            Self::Button => "button",
            Self::Image => "image",
            Self::Video => "video",
            Self::Contact => "contact",
            Self::Spacer => "spacer",
            Self::Columns => "columns",
            Self::Form => "form",
            Self::Unknown(name) => name,
        }
    }

    /// Whether this block renders a form that posts to the form handler.
    pub fn has_form(&self) -> bool {
        matches!(self, Self::Contact | Self::Form)
    }

    /// Default properties a freshly inserted block starts with.
    pub fn default_props(&self) -> Props {
        let value = match self {
            Self::Hero => json!({
                "title": "Welcome to Our Website",
                "subtitle": "Build amazing websites with our simple drag-and-drop builder",
                "description": "Description",
                "buttonText": "Get Started",
                "buttonLink": "#",
                "backgroundColor": "#0066FF",
                "textColor": "#FFFFFF",
                "alignment": "center",
            }),
            Self::Text => json!({
                "content": "<p>Add your text content here. You can customize the font size and alignment.</p>",
                "fontSize": 16,
                "textAlign": "left",
            }),
            Self::Button => json!({
                "text": "Click Me",
                "link": "#",
                "variant": "solid",
                "backgroundColor": "#0066FF",
                "textColor": "#FFFFFF",
                "borderRadius": 8,
                "fontSize": 16,
                "alignment": "left",
            }),
            Self::Image => json!({
                "src": "/placeholder.svg?height=300&width=600",
                "alt": "Image",
                "caption": "",
                "borderRadius": 8,
                "alignment": "center",
            }),
            Self::Video => json!({
                "src": "",
                "autoplay": false,
                "controls": true,
                "alignment": "center",
            }),
            Self::Contact => json!({
                "title": "Get In Touch",
                "description": "We'd love to hear from you. Send us a message and we'll respond as soon as possible.",
                "fields": ["name", "email", "message"],
                "submitText": "Send Message",
            }),
            Self::Spacer => json!({
                "height": 60,
                "backgroundColor": "transparent",
            }),
            Self::Columns => json!({
                "columns": 2,
                "gap": "medium",
                "content": [],
            }),
            Self::Form => json!({
                "title": "Contact Us",
                "description": "Get in touch",
                "buttonText": "Send Message",
                "backgroundColor": "#FFFFFF",
                "borderColor": "#E5E7EB",
            }),
            Self::Unknown(_) => json!({}),
        };

        match value {
            Value::Object(map) => Props::from(map),
            _ => Props::new(),
        }
    }
}

impl From<String> for BlockKind {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user-authored content unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable identifier within the document
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub id: String,

    /// Block type
    #[serde(rename = "type")]
    pub kind: BlockKind,

    /// Property bag
    #[serde(default, deserialize_with = "crate::nullable::or_default")]
    pub props: Props,

    /// Position in the page; absent means "where it sits in the list"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Block {
    /// Create a block with a fresh id and the palette defaults for `kind`.
    pub fn new(kind: BlockKind) -> Self {
        let props = kind.default_props();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            props,
            order: None,
        }
    }
}

/// Sort blocks by their position.
///
/// A block without an explicit `order` sorts at its index in the list. The
/// sort is stable, so ties keep their authored order.
pub fn sorted_blocks(blocks: &[Block]) -> Vec<&Block> {
    let mut indexed: Vec<(i64, &Block)> = blocks
        .iter()
        .enumerate()
        .map(|(index, block)| (block.order.unwrap_or(index as i64), block))
        .collect();

    indexed.sort_by_key(|(order, _)| *order);
    indexed.into_iter().map(|(_, block)| block).collect()
}
