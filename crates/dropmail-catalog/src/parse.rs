//! Reading uploaded product catalogs (Shopify product export CSVs).

use csv::{ReaderBuilder, StringRecord};
use dropmail_core::ProductRow;

use crate::error::CatalogError;

/// Columns every catalog must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Variant SKU",
    "Handle",
    "Title",
    "Option1 Name",
    "Option1 Value",
    "Variant Price",
    "Image Src",
];

/// Header positions for the columns a [`ProductRow`] is built from.
struct Columns {
    handle: usize,
    title: usize,
    sku: usize,
    option1_name: usize,
    option1_value: usize,
    option2_name: Option<usize>,
    option2_value: Option<usize>,
    price: usize,
    image: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, CatalogError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(c).is_none())
            .map(|c| (*c).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::MissingColumns(missing));
        }

        let require =
            |name: &str| find(name).ok_or_else(|| CatalogError::MissingColumns(vec![name.into()]));

        // Option2 counts only when both halves are present.
        let (option2_name, option2_value) = match (find("Option2 Name"), find("Option2 Value")) {
            (Some(n), Some(v)) => (Some(n), Some(v)),
            _ => (None, None),
        };

        Ok(Self {
            handle: require("Handle")?,
            title: require("Title")?,
            sku: require("Variant SKU")?,
            option1_name: require("Option1 Name")?,
            option1_value: require("Option1 Value")?,
            option2_name,
            option2_value,
            price: require("Variant Price")?,
            image: require("Image Src")?,
        })
    }

    fn row(&self, record: &StringRecord) -> ProductRow {
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        let optional = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        ProductRow {
            handle: field(self.handle).trim().to_string(),
            title: field(self.title),
            sku: field(self.sku),
            option1_name: field(self.option1_name),
            option1_value: field(self.option1_value),
            option2_name: optional(self.option2_name),
            option2_value: optional(self.option2_value),
            price: field(self.price).trim().to_string(),
            image_url: field(self.image).trim().to_string(),
        }
    }
}

fn reader(bytes: &[u8]) -> Result<csv::Reader<&[u8]>, CatalogError> {
    std::str::from_utf8(bytes).map_err(|_| CatalogError::NotUtf8)?;
    Ok(ReaderBuilder::new().flexible(true).from_reader(bytes))
}

/// Parses a catalog into product rows, in file order.
///
/// # Errors
///
/// Returns [`CatalogError::MissingColumns`] when a required column is absent,
/// [`CatalogError::NotUtf8`] for non-UTF-8 input, and [`CatalogError::Csv`]
/// for malformed CSV.
pub fn read_catalog(bytes: &[u8]) -> Result<Vec<ProductRow>, CatalogError> {
    let mut rdr = reader(bytes)?;
    let columns = Columns::from_headers(rdr.headers()?)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(columns.row(&record?));
    }
    tracing::info!(rows = rows.len(), "loaded catalog rows");
    Ok(rows)
}

/// Checks the header of an uploaded catalog and returns its data row count.
///
/// # Errors
///
/// Same as [`read_catalog`].
pub fn validate_catalog(bytes: &[u8]) -> Result<usize, CatalogError> {
    let mut rdr = reader(bytes)?;
    Columns::from_headers(rdr.headers()?)?;
    let mut count = 0;
    for record in rdr.records() {
        record?;
        count += 1;
    }
    Ok(count)
}
