use serde::{Deserialize, Serialize};

/// One line of an uploaded product catalog.
///
/// Variants of the same base product share a `handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub handle: String,
    /// Often blank on every variant after the first in a handle group.
    pub title: String,
    pub sku: String,
    pub option1_name: String,
    pub option1_value: String,
    pub option2_name: Option<String>,
    pub option2_value: Option<String>,
    /// Price exactly as it appears in the catalog, e.g. `"19.99"`.
    pub price: String,
    pub image_url: String,
}

impl ProductRow {
    /// Non-empty option values, option1 first.
    pub fn option_values(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.option1_value.as_str())
            .chain(self.option2_value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Directory entry describing one institution.
///
/// The directory is keyed by `name`; `code` is an ordinary attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub logo_url: String,
}

/// A catalog product joined against the institution directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedProduct {
    pub product: ProductRow,
    pub institution_code: String,
    pub institution_name: String,
    pub landing_page_url: String,
    pub logo_url: String,
    /// Storefront link built from the product handle.
    pub product_link: String,
    pub matched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(option1: &str, option2: Option<&str>) -> ProductRow {
        ProductRow {
            handle: "tee-001".to_string(),
            title: "Tee".to_string(),
            sku: "ABC-C-RAD1".to_string(),
            option1_name: "Size".to_string(),
            option1_value: option1.to_string(),
            option2_name: option2.map(|_| "Color".to_string()),
            option2_value: option2.map(str::to_string),
            price: "19.99".to_string(),
            image_url: "https://img.example.com/tee.png".to_string(),
        }
    }

    #[test]
    fn option_values_skips_blanks() {
        let r = row("12 inch", Some("  "));
        assert_eq!(r.option_values().collect::<Vec<_>>(), vec!["12 inch"]);
    }

    #[test]
    fn option_values_keeps_order() {
        let r = row("Large", Some("Maroon"));
        assert_eq!(
            r.option_values().collect::<Vec<_>>(),
            vec!["Large", "Maroon"]
        );
    }
}
