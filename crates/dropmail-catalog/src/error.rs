use dropmail_core::{BlobError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is not valid UTF-8")]
    NotUtf8,

    #[error("catalog is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("no catalog uploaded for campaign {0}")]
    NoCatalog(String),

    #[error("campaign {0} is sending and cannot be reprocessed")]
    CampaignBusy(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}
