//! Collapsing sized variants of one product handle into a single row.

use std::collections::BTreeMap;
use std::str::FromStr;

use dropmail_core::ProductRow;
use rust_decimal::Decimal;

/// Groups rows by `handle` (sorted by handle) and reduces each group.
///
/// - A group with no titled row passes through untouched.
/// - A sized group (any option value mentioning "inch") keeps only its
///   cheapest row, retitled as the base title plus that row's option values.
/// - Any other group keeps every row; blank titles are synthesized the same
///   way.
///
/// Rows with a blank handle belong to no product and are dropped.
#[must_use]
pub fn dedupe(products: Vec<ProductRow>) -> Vec<ProductRow> {
    let mut groups: BTreeMap<String, Vec<ProductRow>> = BTreeMap::new();
    let mut dropped = 0_usize;

    for row in products {
        if row.handle.is_empty() {
            dropped += 1;
            continue;
        }
        groups.entry(row.handle.clone()).or_default().push(row);
    }
    if dropped > 0 {
        tracing::debug!(dropped, "skipped catalog rows without a handle");
    }

    let mut out = Vec::new();
    for group in groups.into_values() {
        reduce_group(group, &mut out);
    }
    out
}

fn reduce_group(group: Vec<ProductRow>, out: &mut Vec<ProductRow>) {
    let Some(base_title) = group
        .iter()
        .map(|r| r.title.trim())
        .find(|t| !t.is_empty())
        .map(str::to_string)
    else {
        tracing::debug!(
            handle = group.first().map_or("", |r| r.handle.as_str()),
            rows = group.len(),
            "no titled row in handle group; keeping rows as-is"
        );
        out.extend(group);
        return;
    };

    if group.iter().any(is_sized) {
        let mut rows = group.into_iter();
        if let Some(first) = rows.next() {
            let mut best = cheapest(first, rows);
            best.title = variant_title(&base_title, &best);
            out.push(best);
        }
        return;
    }

    for mut row in group {
        if row.title.trim().is_empty() {
            row.title = variant_title(&base_title, &row);
        }
        out.push(row);
    }
}

fn is_sized(row: &ProductRow) -> bool {
    std::iter::once(row.option1_value.as_str())
        .chain(row.option2_value.as_deref())
        .any(|v| v.to_lowercase().contains("inch"))
}

fn variant_title(base_title: &str, row: &ProductRow) -> String {
    std::iter::once(base_title)
        .chain(row.option_values())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Lowest-priced row; the first of several equal minimums wins and
/// unparseable prices lose to every parseable one.
fn cheapest(first: ProductRow, rest: impl Iterator<Item = ProductRow>) -> ProductRow {
    let mut best = first;
    let mut best_price = parse_price(&best.price);

    for row in rest {
        let price = parse_price(&row.price);
        let better = match (price, best_price) {
            (Some(p), Some(b)) => p < b,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if better {
            best = row;
            best_price = price;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(handle: &str, title: &str, option1: &str, price: &str) -> ProductRow {
        ProductRow {
            handle: handle.to_string(),
            title: title.to_string(),
            sku: format!("{handle}-C-RAD1"),
            option1_name: "Size".to_string(),
            option1_value: option1.to_string(),
            option2_name: None,
            option2_value: None,
            price: price.to_string(),
            image_url: format!("https://img.example.com/{handle}.png"),
        }
    }

    #[test]
    fn inch_group_keeps_cheapest_variant() {
        let rows = vec![
            row("tee-001", "Tee", "16 inch", "24.99"),
            row("tee-001", "", "12 inch", "19.99"),
        ];
        let out = dedupe(rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price, "19.99");
        assert_eq!(out[0].title, "Tee 12 inch");
    }

    #[test]
    fn inch_match_is_case_insensitive_and_checks_option2() {
        let mut a = row("flag", "Flag", "Red", "9.99");
        a.option2_value = Some("30 INCH".to_string());
        let b = row("flag", "", "Blue", "14.99");
        let out = dedupe(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Flag Red 30 INCH");
    }

    #[test]
    fn first_minimum_wins_on_ties() {
        let mut a = row("pen", "Pennant", "12 inch", "9.99");
        a.sku = "first".to_string();
        let mut b = row("pen", "", "18 inch", "9.99");
        b.sku = "second".to_string();
        let out = dedupe(vec![a, b]);
        assert_eq!(out[0].sku, "first");
    }

    #[test]
    fn unparseable_prices_sort_last() {
        let rows = vec![
            row("pen", "Pennant", "12 inch", "call us"),
            row("pen", "", "18 inch", "29.99"),
        ];
        let out = dedupe(rows);
        assert_eq!(out[0].price, "29.99");
    }

    #[test]
    fn prices_compare_numerically() {
        let rows = vec![
            row("pen", "Pennant", "12 inch", "100.00"),
            row("pen", "", "18 inch", "9.50"),
        ];
        assert_eq!(dedupe(rows)[0].price, "9.50");
    }

    #[test]
    fn non_sized_group_keeps_every_row() {
        let rows = vec![
            row("hoodie", "Hoodie", "Small", "40.00"),
            row("hoodie", "", "Medium", "40.00"),
            row("hoodie", "", "Large", "42.00"),
        ];
        let out = dedupe(rows);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].title, "Hoodie");
        assert_eq!(out[1].title, "Hoodie Medium");
        assert_eq!(out[2].title, "Hoodie Large");
    }

    #[test]
    fn untitled_group_passes_through() {
        let rows = vec![row("x", "", "12 inch", "1.00"), row("x", "", "16 inch", "2.00")];
        let out = dedupe(rows.clone());
        assert_eq!(out, rows);
    }

    #[test]
    fn groups_come_out_sorted_by_handle() {
        let rows = vec![
            row("b", "B", "One", "1"),
            row("a", "A", "One", "1"),
            row("b", "", "Two", "1"),
        ];
        let titles: Vec<_> = dedupe(rows).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["A", "B", "B Two"]);
    }

    #[test]
    fn unsorted_catalog_handles_are_ordered() {
        let rows = vec![
            row("zeta", "Zeta", "One", "1"),
            row("mid", "Mid", "One", "1"),
            row("alpha", "Alpha", "One", "1"),
        ];
        let handles: Vec<_> = dedupe(rows).into_iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec!["alpha", "mid", "zeta"]);
    }
}
