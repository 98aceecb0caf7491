//! Joining catalog rows against the institution directory.

use std::collections::HashMap;

use dropmail_core::{EnrichedProduct, InstitutionInfo, ProductRow};

use crate::sku::extract_institution_code;

/// Sendable products for one institution, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGroup {
    pub code: String,
    pub products: Vec<EnrichedProduct>,
}

/// Tags every row with its institution, marking rows whose SKU carries no
/// known code as unmatched.
#[must_use]
pub fn enrich(
    products: Vec<ProductRow>,
    directory: &HashMap<String, InstitutionInfo>,
    product_base_url: &str,
) -> Vec<EnrichedProduct> {
    products
        .into_iter()
        .map(|product| {
            let code = extract_institution_code(&product.sku);
            let info = directory.get(&code).filter(|_| !code.is_empty());
            let product_link = format!("{product_base_url}{}", product.handle);
            EnrichedProduct {
                institution_name: info.map(|i| i.name.clone()).unwrap_or_default(),
                landing_page_url: info.map(|i| i.page_url.clone()).unwrap_or_default(),
                logo_url: info.map(|i| i.logo_url.clone()).unwrap_or_default(),
                matched: info.is_some(),
                institution_code: code,
                product_link,
                product,
            }
        })
        .collect()
}

/// Drops unmatched rows and rows without an image.
#[must_use]
pub fn filter_sendable(products: Vec<EnrichedProduct>) -> Vec<EnrichedProduct> {
    let before = products.len();
    let kept: Vec<EnrichedProduct> = products
        .into_iter()
        .filter(|p| p.matched && !p.product.image_url.trim().is_empty())
        .collect();
    tracing::info!(
        kept = kept.len(),
        dropped = before - kept.len(),
        "filtered products to matched rows with images"
    );
    kept
}

/// Groups products by institution code, codes in the order their first
/// product appears.
#[must_use]
pub fn group_by_code(products: Vec<EnrichedProduct>) -> Vec<CodeGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<CodeGroup> = Vec::new();

    for product in products {
        if product.institution_code.is_empty() {
            continue;
        }
        match index.get(&product.institution_code) {
            Some(&i) => groups[i].products.push(product),
            None => {
                index.insert(product.institution_code.clone(), groups.len());
                groups.push(CodeGroup {
                    code: product.institution_code.clone(),
                    products: vec![product],
                });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> HashMap<String, InstitutionInfo> {
        let mut dir = HashMap::new();
        for (code, name) in [("RAD", "Radford Highlanders"), ("BAY", "Baylor Bears")] {
            dir.insert(
                code.to_string(),
                InstitutionInfo {
                    code: code.to_string(),
                    name: name.to_string(),
                    page_url: format!("https://shop.example.com/collections/{code}"),
                    logo_url: format!("https://img.example.com/{code}.png"),
                },
            );
        }
        dir
    }

    fn row(handle: &str, sku: &str, image: &str) -> ProductRow {
        ProductRow {
            handle: handle.to_string(),
            title: handle.to_uppercase(),
            sku: sku.to_string(),
            option1_name: "Size".to_string(),
            option1_value: "One".to_string(),
            option2_name: None,
            option2_value: None,
            price: "10.00".to_string(),
            image_url: image.to_string(),
        }
    }

    #[test]
    fn matched_rows_carry_directory_fields() {
        let out = enrich(
            vec![row("tee", "TEE-C-RAD1", "i.png")],
            &directory(),
            "https://shop.example.com/products/",
        );
        let p = &out[0];
        assert!(p.matched);
        assert_eq!(p.institution_code, "RAD");
        assert_eq!(p.institution_name, "Radford Highlanders");
        assert_eq!(p.product_link, "https://shop.example.com/products/tee");
        assert_eq!(p.landing_page_url, "https://shop.example.com/collections/RAD");
    }

    #[test]
    fn unknown_and_missing_codes_are_unmatched() {
        let out = enrich(
            vec![row("a", "A-C-ZZZ1", "i.png"), row("b", "PLAIN", "i.png")],
            &directory(),
            "",
        );
        assert!(out.iter().all(|p| !p.matched));
        assert_eq!(out[0].institution_code, "ZZZ");
        assert_eq!(out[1].institution_code, "");
    }

    #[test]
    fn filter_drops_unmatched_and_imageless() {
        let out = filter_sendable(enrich(
            vec![
                row("a", "A-C-RAD1", "i.png"),
                row("b", "B-C-RAD1", " "),
                row("c", "C-C-ZZZ1", "i.png"),
            ],
            &directory(),
            "",
        ));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].product.handle, "a");
    }

    #[test]
    fn codes_follow_product_order() {
        let groups = group_by_code(enrich(
            vec![
                row("a", "A-C-BAY1", "i.png"),
                row("b", "B-C-RAD1", "i.png"),
                row("c", "C-C-BAY2", "i.png"),
            ],
            &directory(),
            "",
        ));
        let codes: Vec<_> = groups.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(codes, vec!["BAY", "RAD"]);
        assert_eq!(groups[0].products.len(), 2);
        assert_eq!(groups[0].products[1].product.handle, "c");
    }
}
