//! Persistence seams. Components take these traits instead of concrete
//! clients so tests can run against [`crate::memory::MemoryStore`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::campaigns::{Campaign, CampaignStatus, TemplateInstance, TestAccount};
use crate::products::InstitutionInfo;
use crate::records::{Batch, Recipient, RecipientRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid stored value: {0}")]
    Invalid(String),

    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), StoreError>;
    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>, StoreError>;
    /// Newest first.
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StoreError>;
    /// Overwrites every mutable column of an existing campaign.
    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), StoreError>;
    /// Changes only the status column.
    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError>;
    /// Atomically adds `count` to the campaign's running sent total.
    async fn add_emails_sent(&self, campaign_id: &str, count: u32) -> Result<(), StoreError>;
    async fn delete_campaign(&self, campaign_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_records(&self, records: &[RecipientRecord]) -> Result<(), StoreError>;

    /// Records of one batch in fan-out order, starting after `after_record_id`.
    async fn list_batch_records(
        &self,
        campaign_id: &str,
        batch_number: u32,
        after_record_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecipientRecord>, StoreError>;

    async fn list_campaign_records(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<RecipientRecord>, StoreError>;

    /// First record (in fan-out order) carrying `institution_code`.
    async fn find_record_by_code(
        &self,
        campaign_id: &str,
        institution_code: &str,
    ) -> Result<Option<RecipientRecord>, StoreError>;

    async fn find_record_by_email(
        &self,
        campaign_id: &str,
        email: &str,
    ) -> Result<Option<RecipientRecord>, StoreError>;

    /// Sets `email_sent`. Returns `false` when the record was already sent.
    async fn mark_sent(
        &self,
        campaign_id: &str,
        record_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn delete_campaign_records(&self, campaign_id: &str) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Writes a new batch marker. Returns `false` if one already exists.
    async fn insert_batch(&self, batch: &Batch) -> Result<bool, StoreError>;

    async fn get_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
    ) -> Result<Option<Batch>, StoreError>;

    async fn list_batches(&self, campaign_id: &str) -> Result<Vec<Batch>, StoreError>;

    /// Moves a claimable batch to `sending` and takes the lease.
    ///
    /// Fails with [`StoreError::Conflict`] when the batch is held by another
    /// dispatcher or is terminal.
    async fn claim_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Batch, StoreError>;

    async fn record_progress(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
        progress_percent: u32,
    ) -> Result<(), StoreError>;

    async fn complete_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
    ) -> Result<(), StoreError>;

    async fn fail_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
        error_message: &str,
    ) -> Result<(), StoreError>;

    async fn delete_campaign_batches(&self, campaign_id: &str) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self, campaign_id: &str)
        -> Result<Option<TemplateInstance>, StoreError>;
    async fn put_template(&self, template: &TemplateInstance) -> Result<(), StoreError>;
    async fn delete_template(&self, campaign_id: &str) -> Result<bool, StoreError>;
}

/// Source counts keyed by recipient source, plus one page of recipients.
#[derive(Debug, Clone, Default)]
pub struct RecipientPage {
    pub recipients: Vec<Recipient>,
    pub next_key: Option<String>,
    pub source_counts: BTreeMap<String, u64>,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn recipients_for_code(&self, institution_code: &str)
        -> Result<Vec<Recipient>, StoreError>;

    /// Scans the name-keyed directory and indexes it by institution code.
    async fn institution_directory(&self) -> Result<HashMap<String, InstitutionInfo>, StoreError>;

    async fn list_institutions(&self) -> Result<Vec<InstitutionInfo>, StoreError>;
    async fn upsert_institution(&self, info: &InstitutionInfo) -> Result<(), StoreError>;
    async fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError>;

    /// Recipients ordered by email, starting after `after_email`.
    async fn list_recipients(
        &self,
        after_email: Option<&str>,
        limit: usize,
    ) -> Result<RecipientPage, StoreError>;
}

#[async_trait]
pub trait TestAccountStore: Send + Sync {
    async fn list_test_accounts(&self) -> Result<Vec<TestAccount>, StoreError>;
    async fn upsert_test_account(&self, account: &TestAccount) -> Result<(), StoreError>;
    async fn delete_test_account(&self, email: &str) -> Result<bool, StoreError>;
}

/// Everything the pipeline persists, behind one object.
pub trait Store:
    CampaignStore + RecordStore + BatchStore + TemplateStore + DirectoryStore + TestAccountStore
{
}

impl<T> Store for T where
    T: CampaignStore
        + RecordStore
        + BatchStore
        + TemplateStore
        + DirectoryStore
        + TestAccountStore
{
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("blob backend error: {0}")]
    Backend(String),
}

/// Object storage for uploaded catalogs and campaign images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str)
        -> Result<(), BlobError>;
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobError>;
    async fn delete_object(&self, key: &str) -> Result<(), BlobError>;
    fn public_url(&self, key: &str) -> String;
}

/// Blob key for an uploaded catalog.
#[must_use]
pub fn catalog_key(campaign_id: &str, file_name: &str) -> String {
    format!("campaigns/{campaign_id}/{file_name}")
}

/// Blob key for an uploaded campaign image.
#[must_use]
pub fn image_key(campaign_id: &str, file_name: &str) -> String {
    format!("campaigns/{campaign_id}/images/{file_name}")
}
