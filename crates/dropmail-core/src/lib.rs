pub mod app_config;
pub mod campaigns;
pub mod config;
pub mod directory;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod placeholders;
pub mod products;
pub mod records;
#[cfg(feature = "s3")]
pub mod s3;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use campaigns::{
    Campaign, CampaignStatus, ChatMessage, ChatRole, EditKind, TemplateInstance, TestAccount,
    VersionEntry, MAX_CHAT_HISTORY, MAX_VERSION_HISTORY,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use directory::{is_valid_code, load_directory_seed, DirectorySeed};
pub use placeholders::{Placeholder, TemplateConfig};
pub use products::{EnrichedProduct, InstitutionInfo, ProductRow};
pub use records::{
    progress_percent, Batch, BatchStatus, ProductSlot, Recipient, RecipientRecord,
    MAX_PRODUCT_SLOTS,
};
pub use store::{
    catalog_key, image_key, BatchStore, BlobError, BlobStore, CampaignStore, DirectoryStore,
    RecipientPage, RecordStore, Store, StoreError, TemplateStore, TestAccountStore,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file: {0}")]
    SeedFileParse(#[source] serde_yaml::Error),
    #[error("seed validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {kind} status: {value}")]
    InvalidStatus { kind: &'static str, value: String },
    #[error("unknown template placeholder: {0}")]
    UnknownPlaceholder(String),
    #[error("version {index} out of range (history has {len} entries)")]
    VersionOutOfRange { index: usize, len: usize },
}
