//! Institution code extraction from variant SKUs.

use std::sync::LazyLock;

use regex::Regex;

/// Tried in order; the first pattern that matches wins.
///
/// 1. `C-CUST-{LETTERS}` directly followed by a digit.
/// 2. `-C-{LETTERS}` directly followed by a digit.
/// 3. `-C-{LETTERS}` anywhere.
static PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"C-CUST-([A-Za-z]+)\d").expect("valid regex"),
        Regex::new(r"-C-([A-Za-z]+)\d").expect("valid regex"),
        Regex::new(r"-C-([A-Za-z]+)").expect("valid regex"),
    ]
});

/// Extracts the institution code embedded in `sku`, or `""` when none is.
#[must_use]
pub fn extract_institution_code(sku: &str) -> String {
    let sku = sku.trim();
    if sku.is_empty() {
        return String::new();
    }
    PATTERNS
        .iter()
        .find_map(|re| re.captures(sku))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
