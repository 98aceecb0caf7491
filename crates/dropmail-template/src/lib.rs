//! Campaign email templating: the standard skeleton, its default values,
//! and the campaign-wide and per-recipient renderers.

pub mod defaults;
pub mod products;
pub mod render;
pub mod skeleton;
pub mod subject;

use std::sync::LazyLock;

use dropmail_core::Placeholder;
use regex::Regex;
use thiserror::Error;

pub use defaults::{default_config, default_config_with, default_value};
pub use products::products_html;
pub use render::{personalized_values, render_base, render_personalized};
pub use skeleton::STANDARD_TEMPLATE;
pub use subject::{base_subject, personalized_subject};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template references unknown placeholder {{{{{0}}}}}")]
    UnknownPlaceholder(String),
}

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z0-9_]+)\}\}").expect("valid regex"));

/// Every placeholder token referenced by `html`, in first-seen order.
///
/// # Errors
///
/// Returns [`TemplateError::UnknownPlaceholder`] for the first token that is
/// not a known placeholder key.
pub fn validate_template(html: &str) -> Result<Vec<Placeholder>, TemplateError> {
    let mut found = Vec::new();
    for caps in TOKEN_RE.captures_iter(html) {
        let key = &caps[1];
        let placeholder: Placeholder = key
            .parse()
            .map_err(|_| TemplateError::UnknownPlaceholder(key.to_string()))?;
        if !found.contains(&placeholder) {
            found.push(placeholder);
        }
    }
    Ok(found)
}

/// Escapes text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
