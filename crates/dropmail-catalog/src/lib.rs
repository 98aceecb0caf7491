//! Catalog processing: CSV parsing, SKU matching, variant dedupe, directory
//! enrichment and recipient fan-out.

pub mod dedupe;
pub mod enrich;
pub mod error;
pub mod fanout;
pub mod parse;
pub mod pipeline;
pub mod reconcile;
pub mod sku;

pub use dedupe::dedupe;
pub use enrich::{enrich, filter_sendable, group_by_code, CodeGroup};
pub use error::CatalogError;
pub use fanout::{fan_out, FanOutSummary, DEFAULT_BATCH_SIZE};
pub use parse::{read_catalog, validate_catalog, REQUIRED_COLUMNS};
pub use pipeline::{process_campaign, ProcessOptions, ProcessSummary};
pub use reconcile::{reconcile_batches, ReconcileReport};
pub use sku::extract_institution_code;
