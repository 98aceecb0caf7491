use dropmail_core::StoreError;
use dropmail_template::TemplateError;
use thiserror::Error;

/// A single message could not be handed to the provider.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("provider rejected message: {0}")]
    Rejected(String),
}

/// A dispatch run could not start or could not record its state.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("campaign template is not sendable: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
