//! Block-to-HTML rendering.
//!
//! Every block kind has a view model built from its property bag with
//! defaults for anything unset, so rendering never fails on missing or
//! malformed properties. Unknown kinds render a visible placeholder.

use serde::Serialize;

use siteforge_blocks::{format_number, Block, BlockKind, Props, SiteDocument};

use crate::assets::AssetPipeline;
use crate::templates::{PageContext, TemplateEngine};

/// Default endpoint contact forms post to.
pub const DEFAULT_FORM_ENDPOINT: &str = "/api/forms/submit";

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Minify the generated stylesheet
    pub minify: bool,

    /// URL contact forms submit to
    pub form_endpoint: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            minify: true,
            form_endpoint: DEFAULT_FORM_ENDPOINT.to_string(),
        }
    }
}

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to render {kind} block: {message}")]
    Block { kind: String, message: String },

    #[error("Failed to render page: {0}")]
    Page(String),
}

/// Renders site documents to standalone HTML pages.
pub struct SiteRenderer {
    config: RenderConfig,
    templates: TemplateEngine,
}

impl SiteRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            templates: TemplateEngine::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a whole document to HTML.
    ///
    /// Output depends only on the document and the renderer configuration.
    pub fn render(&self, doc: &SiteDocument) -> Result<String, RenderError> {
        let sorted = doc.sorted_blocks();

        let blocks = sorted
            .iter()
            .enumerate()
            .map(|(position, block)| self.render_block(block, position))
            .collect::<Result<Vec<_>, _>>()?;

        let context = PageContext {
            title: doc.page_title().to_string(),
            description: doc.page_description().to_string(),
            favicon: doc.favicon.clone().filter(|f| !f.trim().is_empty()),
            css: self.stylesheet(doc),
            blocks,
            has_forms: sorted.iter().any(|b| b.kind.has_form()),
            form_endpoint: self.config.form_endpoint.clone(),
            project_id: doc.id.clone(),
        };

        self.templates
            .render_page(&context)
            .map_err(|e| RenderError::Page(e.to_string()))
    }

    /// Render one block. `position` is its index in render order.
    pub fn render_block(&self, block: &Block, position: usize) -> Result<String, RenderError> {
        let id = if block.id.trim().is_empty() {
            format!("block-{}", position + 1)
        } else {
            block.id.clone()
        };
        let props = &block.props;

        let result = match &block.kind {
            BlockKind::Hero => self.templates.render_block("blocks/hero.html", &hero(id, props)),
            BlockKind::Text => self.templates.render_block("blocks/text.html", &text(id, props)),
            BlockKind::Button => self
                .templates
                .render_block("blocks/button.html", &button(id, props)),
            BlockKind::Image => self
                .templates
                .render_block("blocks/image.html", &image(id, props)),
            BlockKind::Video => self
                .templates
                .render_block("blocks/video.html", &video(id, props)),
            BlockKind::Contact => self
                .templates
                .render_block("blocks/contact.html", &contact(id, props)),
            BlockKind::Spacer => self
                .templates
                .render_block("blocks/spacer.html", &spacer(id, props)),
            BlockKind::Columns => self
                .templates
                .render_block("blocks/columns.html", &columns(id, props)),
            BlockKind::Form => self.templates.render_block("blocks/form.html", &form(id, props)),
            BlockKind::Unknown(kind) => self.templates.render_block(
                "blocks/unknown.html",
                &UnknownView {
                    id,
                    kind: kind.clone(),
                },
            ),
        };

        result.map_err(|e| RenderError::Block {
            kind: block.kind.to_string(),
            message: e.to_string(),
        })
    }

    /// Generated stylesheet followed by the author's custom CSS.
    fn stylesheet(&self, doc: &SiteDocument) -> String {
        let generated = AssetPipeline::generate_css(&doc.styles);
        let generated = if self.config.minify {
            match AssetPipeline::minify_css(&generated) {
                Ok(css) => css,
                Err(e) => {
                    tracing::warn!("Serving unminified CSS for '{}': {}", doc.title, e);
                    generated
                }
            }
        } else {
            generated
        };

        match doc.custom_css.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(custom) => format!("{}\n{}", generated, AssetPipeline::embed_css(custom)),
            None => generated,
        }
    }
}

impl Default for SiteRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

fn alignment(props: &Props, keys: &[&str], default: &'static str) -> &'static str {
    match props.first_str(keys).as_deref().map(str::trim) {
        Some("left") => "left",
        Some("center") => "center",
        Some("right") => "right",
        _ => default,
    }
}

fn px(props: &Props, key: &str, default: f64) -> String {
    let value = props.number(key).filter(|n| n.is_finite()).unwrap_or(default);
    format_number(value.max(0.0))
}

#[derive(Serialize)]
struct HeroView {
    id: String,
    title: String,
    subtitle: String,
    description: String,
    button_text: String,
    button_link: String,
    background_image: Option<String>,
    background_color: String,
    alignment: &'static str,
    text_color: String,
}

fn hero(id: String, props: &Props) -> HeroView {
    HeroView {
        id,
        title: props.str_or("title", "Welcome"),
        subtitle: props.str_or("subtitle", "Subtitle"),
        description: props.str_or("description", "Description"),
        button_text: props.str_or("buttonText", "Get Started"),
        button_link: props.str_or("buttonLink", "#"),
        background_image: props.non_empty_str("backgroundImage"),
        background_color: props.str_or("backgroundColor", "#0066FF"),
        alignment: alignment(props, &["alignment"], "center"),
        text_color: props.str_or("textColor", "#FFFFFF"),
    }
}

#[derive(Serialize)]
struct TextView {
    id: String,
    content: String,
    font_size: String,
    alignment: &'static str,
}

fn text(id: String, props: &Props) -> TextView {
    let font_size = match props.str("fontSize").as_deref().map(str::trim) {
        Some("sm") | Some("small") => "14".to_string(),
        Some("md") | Some("medium") | Some("base") => "16".to_string(),
        Some("lg") | Some("large") => "18".to_string(),
        Some("xl") => "20".to_string(),
        _ => px(props, "fontSize", 16.0),
    };

    TextView {
        id,
        content: props.str_or("content", "<p>Text content</p>"),
        font_size,
        alignment: alignment(props, &["textAlign", "alignment"], "left"),
    }
}

#[derive(Serialize)]
struct ButtonView {
    id: String,
    text: String,
    link: String,
    background_color: String,
    text_color: String,
    border_radius: String,
    font_size: String,
    alignment: &'static str,
    outline: bool,
}

fn button(id: String, props: &Props) -> ButtonView {
    ButtonView {
        id,
        text: props.str_or("text", "Button"),
        link: props.first_str(&["link", "href"]).unwrap_or_else(|| "#".to_string()),
        background_color: props.str_or("backgroundColor", "#0066FF"),
        text_color: props.str_or("textColor", "#FFFFFF"),
        border_radius: px(props, "borderRadius", 8.0),
        font_size: px(props, "fontSize", 16.0),
        alignment: alignment(props, &["alignment"], "left"),
        outline: props.str("variant").as_deref() == Some("outline"),
    }
}

#[derive(Serialize)]
struct ImageView {
    id: String,
    src: String,
    alt: String,
    caption: Option<String>,
    border_radius: String,
    alignment: &'static str,
}

fn image(id: String, props: &Props) -> ImageView {
    ImageView {
        id,
        src: props
            .non_empty_str("src")
            .unwrap_or_else(|| "/placeholder.svg?height=300&width=600".to_string()),
        alt: props.str_or("alt", "Image"),
        caption: props.non_empty_str("caption"),
        border_radius: px(props, "borderRadius", 8.0),
        alignment: alignment(props, &["alignment"], "center"),
    }
}

#[derive(Serialize)]
struct VideoView {
    id: String,
    src: Option<String>,
    poster: Option<String>,
    autoplay: bool,
    controls: bool,
    alignment: &'static str,
}

fn video(id: String, props: &Props) -> VideoView {
    VideoView {
        id,
        src: props.non_empty_str("src"),
        poster: props.non_empty_str("poster"),
        autoplay: props.bool("autoplay").unwrap_or(false),
        controls: props.bool("controls").unwrap_or(true),
        alignment: alignment(props, &["alignment"], "center"),
    }
}

#[derive(Serialize)]
struct FieldView {
    name: &'static str,
    label: &'static str,
    input_type: &'static str,
    placeholder: &'static str,
    multiline: bool,
    required: bool,
}

fn field(name: &str) -> Option<FieldView> {
    let view = match name {
        "name" => FieldView {
            name: "name",
            label: "Name",
            input_type: "text",
            placeholder: "Your name",
            multiline: false,
            required: true,
        },
        "email" => FieldView {
            name: "email",
            label: "Email",
            input_type: "email",
            placeholder: "your@email.com",
            multiline: false,
            required: true,
        },
        "phone" => FieldView {
            name: "phone",
            label: "Phone",
            input_type: "tel",
            placeholder: "Your phone number",
            multiline: false,
            required: false,
        },
        "message" => FieldView {
            name: "message",
            label: "Message",
            input_type: "text",
            placeholder: "Your message",
            multiline: true,
            required: true,
        },
        _ => return None,
    };
    Some(view)
}

#[derive(Serialize)]
struct ContactView {
    id: String,
    title: String,
    description: String,
    fields: Vec<FieldView>,
    submit_text: String,
}

fn contact(id: String, props: &Props) -> ContactView {
    let requested = props.string_list("fields").unwrap_or_else(|| {
        ["name", "email", "message"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    });

    let mut fields: Vec<FieldView> = Vec::new();
    for name in &requested {
        if let Some(view) = field(name.trim()) {
            if !fields.iter().any(|f| f.name == view.name) {
                fields.push(view);
            }
        }
    }

    ContactView {
        id,
        title: props.str_or("title", "Get In Touch"),
        description: props.str_or(
            "description",
            "We'd love to hear from you. Send us a message and we'll respond as soon as possible.",
        ),
        fields,
        submit_text: props.str_or("submitText", "Send Message"),
    }
}

#[derive(Serialize)]
struct SpacerView {
    id: String,
    height: String,
    background_color: String,
}

fn spacer(id: String, props: &Props) -> SpacerView {
    let height = match props.str("height").as_deref().map(str::trim) {
        Some("small") => "32".to_string(),
        Some("medium") => "64".to_string(),
        Some("large") => "128".to_string(),
        _ => px(props, "height", 60.0),
    };

    SpacerView {
        id,
        height,
        background_color: props.str_or("backgroundColor", "transparent"),
    }
}

#[derive(Serialize)]
struct ColumnsView {
    id: String,
    columns: usize,
    gap: &'static str,
    cells: Vec<String>,
}

fn columns(id: String, props: &Props) -> ColumnsView {
    let count = props
        .number("columns")
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(1.0, 4.0) as usize)
        .unwrap_or(2);

    let gap = match props.str("gap").as_deref() {
        Some("small") => "1rem",
        Some("large") => "2rem",
        _ => "1.5rem",
    };

    let content = props.array("content");
    let cells = (0..count)
        .map(|index| {
            content
                .and_then(|items| items.get(index))
                .and_then(|item| match item {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Object(map) => {
                        map.get("content").and_then(|c| c.as_str()).map(str::to_string)
                    }
                    _ => None,
                })
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("Column {}", index + 1))
        })
        .collect();

    ColumnsView {
        id,
        columns: count,
        gap,
        cells,
    }
}

#[derive(Serialize)]
struct FormView {
    id: String,
    title: String,
    description: String,
    button_text: String,
    background_color: String,
    border_color: String,
}

fn form(id: String, props: &Props) -> FormView {
    FormView {
        id,
        title: props.str_or("title", "Contact Us"),
        description: props.str_or("description", "Get in touch"),
        button_text: props.str_or("buttonText", "Send Message"),
        background_color: props.str_or("backgroundColor", "#FFFFFF"),
        border_color: props.str_or("borderColor", "#E5E7EB"),
    }
}

#[derive(Serialize)]
struct UnknownView {
    id: String,
    kind: String,
}
