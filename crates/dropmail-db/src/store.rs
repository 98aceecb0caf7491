//! [`PgStore`]: the core persistence traits over a Postgres pool.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dropmail_core::{
    Batch, BatchStore, Campaign, CampaignStatus, CampaignStore, DirectoryStore, InstitutionInfo, Recipient,
    RecipientPage, RecipientRecord, RecordStore, StoreError, TemplateInstance, TemplateStore,
    TestAccount, TestAccountStore,
};
use sqlx::PgPool;

use crate::{batches, campaigns, directory, records, templates, test_accounts};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        Ok(campaigns::insert_campaign(&self.pool, campaign).await?)
    }

    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>, StoreError> {
        Ok(campaigns::get_campaign(&self.pool, campaign_id).await?)
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        Ok(campaigns::list_campaigns(&self.pool).await?)
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        Ok(campaigns::update_campaign(&self.pool, campaign).await?)
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        Ok(campaigns::set_campaign_status(&self.pool, campaign_id, status).await?)
    }

    async fn add_emails_sent(&self, campaign_id: &str, count: u32) -> Result<(), StoreError> {
        Ok(campaigns::add_emails_sent(&self.pool, campaign_id, count).await?)
    }

    async fn delete_campaign(&self, campaign_id: &str) -> Result<bool, StoreError> {
        Ok(campaigns::delete_campaign(&self.pool, campaign_id).await?)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn put_records(&self, records: &[RecipientRecord]) -> Result<(), StoreError> {
        Ok(records::insert_records(&self.pool, records).await?)
    }

    async fn list_batch_records(
        &self,
        campaign_id: &str,
        batch_number: u32,
        after_record_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecipientRecord>, StoreError> {
        Ok(records::list_batch_records(
            &self.pool,
            campaign_id,
            batch_number,
            after_record_id,
            limit,
        )
        .await?)
    }

    async fn list_campaign_records(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<RecipientRecord>, StoreError> {
        Ok(records::list_campaign_records(&self.pool, campaign_id).await?)
    }

    async fn find_record_by_code(
        &self,
        campaign_id: &str,
        institution_code: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        Ok(records::find_record_by_code(&self.pool, campaign_id, institution_code).await?)
    }

    async fn find_record_by_email(
        &self,
        campaign_id: &str,
        email: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        Ok(records::find_record_by_email(&self.pool, campaign_id, email).await?)
    }

    async fn mark_sent(
        &self,
        campaign_id: &str,
        record_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(records::mark_record_sent(&self.pool, campaign_id, record_id, sent_at).await?)
    }

    async fn delete_campaign_records(&self, campaign_id: &str) -> Result<u64, StoreError> {
        Ok(records::delete_campaign_records(&self.pool, campaign_id).await?)
    }
}

#[async_trait]
impl BatchStore for PgStore {
    async fn insert_batch(&self, batch: &Batch) -> Result<bool, StoreError> {
        Ok(batches::insert_batch(&self.pool, batch).await?)
    }

    async fn get_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
    ) -> Result<Option<Batch>, StoreError> {
        Ok(batches::get_batch(&self.pool, campaign_id, batch_number).await?)
    }

    async fn list_batches(&self, campaign_id: &str) -> Result<Vec<Batch>, StoreError> {
        Ok(batches::list_batches(&self.pool, campaign_id).await?)
    }

    async fn claim_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Batch, StoreError> {
        Ok(batches::claim_batch(&self.pool, campaign_id, batch_number, now, lease_until).await?)
    }

    async fn record_progress(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
        progress_percent: u32,
    ) -> Result<(), StoreError> {
        Ok(batches::record_batch_progress(
            &self.pool,
            campaign_id,
            batch_number,
            emails_sent,
            failed_emails,
            progress_percent,
        )
        .await?)
    }

    async fn complete_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
    ) -> Result<(), StoreError> {
        Ok(batches::complete_batch(
            &self.pool,
            campaign_id,
            batch_number,
            emails_sent,
            failed_emails,
        )
        .await?)
    }

    async fn fail_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
        error_message: &str,
    ) -> Result<(), StoreError> {
        Ok(batches::fail_batch(
            &self.pool,
            campaign_id,
            batch_number,
            emails_sent,
            failed_emails,
            error_message,
        )
        .await?)
    }

    async fn delete_campaign_batches(&self, campaign_id: &str) -> Result<u64, StoreError> {
        Ok(batches::delete_campaign_batches(&self.pool, campaign_id).await?)
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn get_template(
        &self,
        campaign_id: &str,
    ) -> Result<Option<TemplateInstance>, StoreError> {
        Ok(templates::get_template(&self.pool, campaign_id).await?)
    }

    async fn put_template(&self, template: &TemplateInstance) -> Result<(), StoreError> {
        Ok(templates::upsert_template(&self.pool, template).await?)
    }

    async fn delete_template(&self, campaign_id: &str) -> Result<bool, StoreError> {
        Ok(templates::delete_template(&self.pool, campaign_id).await?)
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn recipients_for_code(
        &self,
        institution_code: &str,
    ) -> Result<Vec<Recipient>, StoreError> {
        Ok(directory::recipients_for_code(&self.pool, institution_code).await?)
    }

    async fn institution_directory(
        &self,
    ) -> Result<HashMap<String, InstitutionInfo>, StoreError> {
        Ok(directory::institution_directory(&self.pool).await?)
    }

    async fn list_institutions(&self) -> Result<Vec<InstitutionInfo>, StoreError> {
        Ok(directory::list_institutions(&self.pool).await?)
    }

    async fn upsert_institution(&self, info: &InstitutionInfo) -> Result<(), StoreError> {
        Ok(directory::upsert_institution(&self.pool, info).await?)
    }

    async fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        Ok(directory::upsert_recipient(&self.pool, recipient).await?)
    }

    async fn list_recipients(
        &self,
        after_email: Option<&str>,
        limit: usize,
    ) -> Result<RecipientPage, StoreError> {
        Ok(directory::list_recipients(&self.pool, after_email, limit).await?)
    }
}

#[async_trait]
impl TestAccountStore for PgStore {
    async fn list_test_accounts(&self) -> Result<Vec<TestAccount>, StoreError> {
        Ok(test_accounts::list_test_accounts(&self.pool).await?)
    }

    async fn upsert_test_account(&self, account: &TestAccount) -> Result<(), StoreError> {
        Ok(test_accounts::upsert_test_account(&self.pool, account).await?)
    }

    async fn delete_test_account(&self, email: &str) -> Result<bool, StoreError> {
        Ok(test_accounts::delete_test_account(&self.pool, email).await?)
    }
}
