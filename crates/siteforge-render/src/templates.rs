//! Template engine for rendering pages and blocks.

use minijinja::Environment;
use serde::Serialize;

use crate::assets::css_value;

/// Context for rendering the page shell.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    /// Document title
    pub title: String,
    /// Description meta content
    pub description: String,
    /// Optional favicon URL
    pub favicon: Option<String>,
    /// Complete stylesheet (generated + custom)
    pub css: String,
    /// Rendered block markup, in page order
    pub blocks: Vec<String>,
    /// Whether the page contains a contact form
    pub has_forms: bool,
    /// Form submission endpoint
    pub form_endpoint: String,
    /// Project identifier sent with form submissions
    pub project_id: String,
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with the page and block templates.
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_filter("css", |value: String| css_value(&value));

        for (name, source) in TEMPLATES {
            env.add_template_owned(name.to_string(), source.to_string())
                .expect("Failed to add built-in template");
        }

        Self { env }
    }

    /// Render the page shell.
    pub fn render_page(&self, context: &PageContext) -> Result<String, minijinja::Error> {
        self.env.get_template("page.html")?.render(context)
    }

    /// Render a single block template with its view model.
    pub fn render_block<S: Serialize>(
        &self,
        template: &str,
        view: &S,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template(template)?.render(view)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const TEMPLATES: &[(&str, &str)] = &[
    ("page.html", PAGE_TEMPLATE),
    ("blocks/hero.html", HERO_TEMPLATE),
    ("blocks/text.html", TEXT_TEMPLATE),
    ("blocks/button.html", BUTTON_TEMPLATE),
    ("blocks/image.html", IMAGE_TEMPLATE),
    ("blocks/video.html", VIDEO_TEMPLATE),
    ("blocks/contact.html", CONTACT_TEMPLATE),
    ("blocks/spacer.html", SPACER_TEMPLATE),
    ("blocks/columns.html", COLUMNS_TEMPLATE),
    ("blocks/form.html", FORM_TEMPLATE),
    ("blocks/unknown.html", UNKNOWN_TEMPLATE),
];

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{ title }}</title>
  <meta name="description" content="{{ description }}">
  {% if favicon %}<link rel="icon" href="{{ favicon }}">
  {% endif %}<style>
{{ css | safe }}
  </style>
</head>
<body>
{% for block in blocks %}{{ block | safe }}
{% endfor %}{% if has_forms %}<script>
document.addEventListener('DOMContentLoaded', function () {
  var endpoint = {{ form_endpoint | tojson }};
  var projectId = {{ project_id | tojson }};
  document.querySelectorAll('form[data-form-type="contact"]').forEach(function (form) {
    form.addEventListener('submit', function (e) {
      e.preventDefault();
      var data = Object.fromEntries(new FormData(form).entries());
      data.projectId = projectId;
      fetch(endpoint, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(data)
      })
        .then(function (response) { return response.json(); })
        .then(function (result) {
          if (result.success) {
            alert('Message sent successfully!');
            form.reset();
          } else {
            alert('Failed to send message. Please try again.');
          }
        })
        .catch(function () {
          alert('Failed to send message. Please try again.');
        });
    });
  });
});
</script>
{% endif %}</body>
</html>
"##;

const HERO_TEMPLATE: &str = r##"<section class="block block-hero" id="{{ id }}" style="position: relative; padding: 80px 0; text-align: {{ alignment }}; background-color: {% if background_image %}transparent; background-image: url('{{ background_image | css }}'); background-size: cover; background-position: center{% else %}{{ background_color | css }}{% endif %}; color: {{ text_color | css }};">
  {% if background_image %}<div style="position: absolute; inset: 0; background: rgba(0,0,0,0.4);"></div>
  {% endif %}<div class="container" style="position: relative;">
    <h1 style="font-size: 3.5rem; font-weight: bold; margin-bottom: 1rem;">{{ title }}</h1>
    <h2 style="font-size: 1.5rem; margin-bottom: 1.5rem; opacity: 0.9;">{{ subtitle }}</h2>
    <p style="font-size: 1.125rem; margin-bottom: 2rem; opacity: 0.8; max-width: 600px; margin-left: auto; margin-right: auto;">{{ description }}</p>
    <a href="{{ button_link }}" class="btn" style="background: white; color: #1f2937;">{{ button_text }}</a>
  </div>
</section>"##;

const TEXT_TEMPLATE: &str = r##"<section class="block block-text" id="{{ id }}" style="padding: 2rem 0;">
  <div class="container">
    <div style="font-size: {{ font_size }}px; color: #333; text-align: {{ alignment }};">
      {{ content | safe }}
    </div>
  </div>
</section>"##;

const BUTTON_TEMPLATE: &str = r##"<section class="block block-button" id="{{ id }}" style="padding: 1rem 0;">
  <div class="container" style="text-align: {{ alignment }};">
    <a href="{{ link }}" class="btn{% if outline %} btn-outline{% endif %}" style="{% if outline %}color: {{ background_color | css }}; border-color: {{ background_color | css }};{% else %}background-color: {{ background_color | css }}; color: {{ text_color | css }};{% endif %} border-radius: {{ border_radius }}px; font-size: {{ font_size }}px;">{{ text }}</a>
  </div>
</section>"##;

const IMAGE_TEMPLATE: &str = r##"<section class="block block-image" id="{{ id }}" style="padding: 1rem 0;">
  <div class="container" style="text-align: {{ alignment }};">
    <img src="{{ src }}" alt="{{ alt }}" style="border-radius: {{ border_radius }}px;">
    {% if caption %}<p style="margin-top: 1rem; font-size: 14px; color: #6b7280; font-style: italic;">{{ caption }}</p>
    {% endif %}</div>
</section>"##;

const VIDEO_TEMPLATE: &str = r##"<section class="block block-video" id="{{ id }}" style="padding: 2rem 0;">
  <div class="container" style="max-width: 768px; text-align: {{ alignment }};">
    {% if src %}<video src="{{ src }}"{% if poster %} poster="{{ poster }}"{% endif %}{% if autoplay %} autoplay muted playsinline{% endif %}{% if controls %} controls{% endif %} style="width: 100%; border-radius: 8px;">Your browser does not support the video tag.</video>
    {% else %}<div style="padding: 3rem; border: 2px dashed #d1d5db; border-radius: 8px; text-align: center; color: #6b7280;">Add a video URL to display your video</div>
    {% endif %}</div>
</section>"##;

const CONTACT_TEMPLATE: &str = r##"<section class="block block-contact" id="{{ id }}" style="padding: 4rem 0;">
  <div class="container" style="max-width: 480px;">
    <div style="text-align: center; margin-bottom: 2rem;">
      <h2 style="font-size: 1.5rem; font-weight: bold; margin-bottom: 1rem;">{{ title }}</h2>
      <p style="color: #6b7280;">{{ description }}</p>
    </div>
    <form data-form-type="contact">
      {% for field in fields %}<div class="form-group">
        <label class="form-label" for="{{ id }}-{{ field.name }}">{{ field.label }}</label>
        {% if field.multiline %}<textarea id="{{ id }}-{{ field.name }}" name="{{ field.name }}" class="form-input" rows="4" placeholder="{{ field.placeholder }}" required></textarea>{% else %}<input id="{{ id }}-{{ field.name }}" type="{{ field.input_type }}" name="{{ field.name }}" class="form-input" placeholder="{{ field.placeholder }}"{% if field.required %} required{% endif %}>{% endif %}
      </div>
      {% endfor %}<button type="submit" class="btn" style="width: 100%;">{{ submit_text }}</button>
    </form>
  </div>
</section>"##;

const SPACER_TEMPLATE: &str = r##"<div class="block block-spacer" id="{{ id }}" style="height: {{ height }}px; background-color: {{ background_color | css }};"></div>"##;

const COLUMNS_TEMPLATE: &str = r##"<section class="block block-columns" id="{{ id }}" style="padding: 2rem 0;">
  <div class="container">
    <div class="columns-grid" style="grid-template-columns: repeat({{ columns }}, minmax(0, 1fr)); gap: {{ gap }};">
      {% for cell in cells %}<div style="padding: 1.5rem; border: 1px solid #e5e7eb; border-radius: 8px;">{{ cell | safe }}</div>
      {% endfor %}</div>
  </div>
</section>"##;

const FORM_TEMPLATE: &str = r##"<section class="block block-form" id="{{ id }}" style="padding: 2rem 0;">
  <div class="container">
    <div style="max-width: 500px; margin: 0 auto; padding: 2rem; background: {{ background_color | css }}; border: 1px solid {{ border_color | css }}; border-radius: 12px;">
      <h3 style="font-size: 1.5rem; font-weight: 600; margin-bottom: 0.5rem;">{{ title }}</h3>
      <p style="color: #6b7280; margin-bottom: 2rem;">{{ description }}</p>
      <form data-form-type="contact">
        <div class="form-group">
          <label class="form-label">Name</label>
          <input type="text" name="name" class="form-input" required>
        </div>
        <div class="form-group">
          <label class="form-label">Email</label>
          <input type="email" name="email" class="form-input" required>
        </div>
        <div class="form-group">
          <label class="form-label">Message</label>
          <textarea name="message" class="form-input" rows="4" required></textarea>
        </div>
        <button type="submit" class="btn" style="width: 100%;">{{ button_text }}</button>
      </form>
    </div>
  </div>
</section>"##;

const UNKNOWN_TEMPLATE: &str = r##"<div class="block block-unknown" id="{{ id }}" style="padding: 1rem; border: 1px solid #ef4444; background: #fef2f2; color: #dc2626;">Unknown block type: {{ kind }}</div>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    fn page(blocks: Vec<String>, has_forms: bool) -> PageContext {
        PageContext {
            title: "Bella Vista".to_string(),
            description: "Fine dining".to_string(),
            favicon: None,
            css: "body{color:red}".to_string(),
            blocks,
            has_forms,
            form_endpoint: "/api/forms/submit".to_string(),
            project_id: "p1".to_string(),
        }
    }

    #[test]
    fn renders_page_shell() {
        let engine = TemplateEngine::new();

        let html = engine
            .render_page(&page(vec!["<p>block</p>".to_string()], false))
            .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Bella Vista</title>"));
        assert!(html.contains("body{color:red}"));
        assert!(html.contains("<p>block</p>"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("rel=\"icon\""));
    }

    #[test]
    fn includes_form_handler_only_with_forms() {
        let engine = TemplateEngine::new();

        let html = engine.render_page(&page(vec![], true)).unwrap();

        assert!(html.contains(r#"form[data-form-type="contact"]"#));
        assert!(html.contains(r#"var projectId = "p1";"#));
        assert!(html.contains(r#"var endpoint = "/api/forms/submit";"#));
    }

    #[test]
    fn escapes_page_title() {
        let engine = TemplateEngine::new();
        let mut ctx = page(vec![], false);
        ctx.title = "<script>alert(1)</script>".to_string();

        let html = engine.render_page(&ctx).unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn css_filter_strips_breakers() {
        let engine = TemplateEngine::new();

        let html = engine
            .render_block(
                "blocks/spacer.html",
                &context! { id => "s", height => 10, background_color => "red;position:fixed" },
            )
            .unwrap();

        assert!(html.contains("background-color: redposition:fixed;"));
    }
}
