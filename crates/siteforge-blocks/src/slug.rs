//! URL slug generation.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Fallback slug for titles with no usable characters.
pub const FALLBACK_SLUG: &str = "site";

/// Convert a title into a subdomain-safe slug.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lower, "");
    let dashed = WHITESPACE.replace_all(cleaned.trim(), "-");
    let collapsed = DASHES.replace_all(&dashed, "-");
    let slug = collapsed.trim_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Check a user-supplied slug: lowercase letters, digits and hyphens, 1-50 chars.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 50
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
