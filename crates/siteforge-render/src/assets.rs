//! Stylesheet generation for rendered sites.

use siteforge_blocks::StyleSettings;

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Generate the page stylesheet from the site's style settings.
    pub fn generate_css(styles: &StyleSettings) -> String {
        let primary = css_value(&styles.primary_color);
        let primary = if primary.is_empty() {
            siteforge_blocks::styles::DEFAULT_PRIMARY_COLOR.to_string()
        } else {
            primary
        };
        let font = css_value(&styles.font_family);
        let font = if font.is_empty() {
            siteforge_blocks::styles::DEFAULT_FONT_FAMILY.to_string()
        } else {
            font
        };

        format!(
            r#":root {{
  --primary-color: {primary};
  --spacing: {spacing};
}}
{base}
body {{
  font-family: {font};
}}
"#,
            primary = primary,
            spacing = styles.spacing.css_value(),
            base = BASE_CSS,
            font = font,
        )
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Make author CSS safe to embed in a `<style>` element.
    ///
    /// Only the closing-tag sequence is neutralised; everything else is the
    /// author's own stylesheet.
    pub fn embed_css(css: &str) -> String {
        let mut out = String::with_capacity(css.len());
        let mut rest = css;
        while let Some(pos) = find_ignore_case(rest, "</style") {
            out.push_str(&rest[..pos]);
            out.push_str("<\\/");
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Strip characters that could end a CSS declaration or an HTML attribute.
///
/// Used for every author value placed inside an inline `style` attribute.
pub fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\'' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

const BASE_CSS: &str = r#"
* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  line-height: 1.6;
  color: #333;
}

.container {
  max-width: 1200px;
  margin: 0 auto;
  padding: 0 var(--spacing);
}

.btn {
  display: inline-block;
  padding: 12px 24px;
  background-color: var(--primary-color);
  color: white;
  text-decoration: none;
  border-radius: 8px;
  font-weight: 600;
  transition: all 0.2s ease;
  border: none;
  cursor: pointer;
}

.btn:hover {
  opacity: 0.9;
  transform: translateY(-1px);
}

.btn-outline {
  background-color: transparent;
  color: var(--primary-color);
  border: 2px solid var(--primary-color);
}

.btn-outline:hover {
  background-color: var(--primary-color);
  color: white;
}

img, video {
  max-width: 100%;
  height: auto;
}

.form-group {
  margin-bottom: 1rem;
}

.form-label {
  display: block;
  margin-bottom: 0.5rem;
  font-weight: 500;
}

.form-input {
  width: 100%;
  padding: 12px;
  border: 1px solid #ddd;
  border-radius: 6px;
  font-size: 16px;
}

.form-input:focus {
  outline: none;
  border-color: var(--primary-color);
  box-shadow: 0 0 0 3px rgba(0, 102, 255, 0.1);
}

.columns-grid {
  display: grid;
}

@media (max-width: 768px) {
  .container {
    padding: 0 1rem;
  }

  .columns-grid {
    grid-template-columns: 1fr !important;
  }

  h1 {
    font-size: 2rem !important;
  }

  h2 {
    font-size: 1.5rem !important;
  }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use siteforge_blocks::Spacing;

    #[test]
    fn generates_css_variables() {
        let styles = StyleSettings {
            primary_color: "#FF6B6B".to_string(),
            spacing: Spacing::Tight,
            ..Default::default()
        };

        let css = AssetPipeline::generate_css(&styles);

        assert!(css.contains("--primary-color: #FF6B6B;"));
        assert!(css.contains("--spacing: 0.5rem;"));
        assert!(css.contains("font-family: Inter"));
    }

    #[test]
    fn empty_color_uses_default() {
        let styles = StyleSettings {
            primary_color: "  ".to_string(),
            ..Default::default()
        };

        let css = AssetPipeline::generate_css(&styles);
        assert!(css.contains("--primary-color: #0066FF;"));
    }

    #[test]
    fn minifies_css() {
        let css = AssetPipeline::generate_css(&StyleSettings::default());

        let minified = AssetPipeline::minify_css(&css).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".btn-outline"));
        assert!(minified.len() < css.len());
    }

    #[test]
    fn strips_declaration_breakers() {
        assert_eq!(css_value("red; } body { display:none"), "red  body  display:none");
        assert_eq!(css_value("#0066FF"), "#0066FF");
    }

    #[test]
    fn neutralises_closing_style_tags() {
        let embedded = AssetPipeline::embed_css("a{} </STYLE><script>x</script>");
        assert!(!embedded.to_ascii_lowercase().contains("</style"));
        assert!(embedded.contains("<\\/STYLE>"));
    }
}
