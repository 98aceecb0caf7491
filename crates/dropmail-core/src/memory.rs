//! In-process implementations of the store traits, used by tests across the
//! workspace.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::campaigns::{Campaign, CampaignStatus, TemplateInstance, TestAccount};
use crate::products::InstitutionInfo;
use crate::records::{progress_percent, Batch, BatchStatus, Recipient, RecipientRecord};
use crate::store::{
    BatchStore, BlobError, BlobStore, CampaignStore, DirectoryStore, RecipientPage, RecordStore,
    StoreError, TemplateStore, TestAccountStore,
};

#[derive(Debug, Default)]
struct Inner {
    campaigns: BTreeMap<String, Campaign>,
    /// Per campaign, kept sorted by `sequence`.
    records: HashMap<String, Vec<RecipientRecord>>,
    batches: BTreeMap<(String, u32), Batch>,
    templates: HashMap<String, TemplateInstance>,
    /// Keyed by display name.
    institutions: BTreeMap<String, InstitutionInfo>,
    recipients: BTreeMap<String, Recipient>,
    test_accounts: BTreeMap<String, TestAccount>,
    failing_codes: HashSet<String>,
    failing_marks: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every recipient lookup for `code` fail with a backend error.
    pub async fn fail_recipient_lookup(&self, code: &str) {
        self.inner.lock().await.failing_codes.insert(code.to_string());
    }

    /// Makes `mark_sent` for `record_id` fail with a backend error.
    pub async fn fail_mark_sent(&self, record_id: &str) {
        self.inner
            .lock()
            .await
            .failing_marks
            .insert(record_id.to_string());
    }
}

fn batch_key(campaign_id: &str, batch_number: u32) -> (String, u32) {
    (campaign_id.to_string(), batch_number)
}

fn missing_batch(campaign_id: &str, batch_number: u32) -> StoreError {
    StoreError::not_found("batch", format!("{campaign_id}#{batch_number}"))
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.campaigns.contains_key(&campaign.campaign_id) {
            return Err(StoreError::Conflict(format!(
                "campaign {} already exists",
                campaign.campaign_id
            )));
        }
        inner
            .campaigns
            .insert(campaign.campaign_id.clone(), campaign.clone());
        Ok(())
    }

    async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>, StoreError> {
        Ok(self.inner.lock().await.campaigns.get(campaign_id).cloned())
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        let mut all: Vec<Campaign> = self.inner.lock().await.campaigns.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let slot = inner
            .campaigns
            .get_mut(&campaign.campaign_id)
            .ok_or_else(|| StoreError::not_found("campaign", &campaign.campaign_id))?;
        *slot = campaign.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let campaign = inner
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| StoreError::not_found("campaign", campaign_id))?;
        campaign.status = status;
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn add_emails_sent(&self, campaign_id: &str, count: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let campaign = inner
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| StoreError::not_found("campaign", campaign_id))?;
        campaign.emails_sent = campaign.emails_sent.saturating_add(count);
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_campaign(&self, campaign_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .campaigns
            .remove(campaign_id)
            .is_some())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put_records(&self, records: &[RecipientRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        for record in records {
            let list = inner.records.entry(record.campaign_id.clone()).or_default();
            match list.iter_mut().find(|r| r.record_id == record.record_id) {
                Some(existing) => *existing = record.clone(),
                None => list.push(record.clone()),
            }
            list.sort_by_key(|r| r.sequence);
        }
        Ok(())
    }

    async fn list_batch_records(
        &self,
        campaign_id: &str,
        batch_number: u32,
        after_record_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecipientRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let Some(list) = inner.records.get(campaign_id) else {
            return Ok(Vec::new());
        };
        let after_seq = after_record_id
            .and_then(|id| list.iter().find(|r| r.record_id == id))
            .map(|r| r.sequence);
        Ok(list
            .iter()
            .filter(|r| r.batch_number == batch_number)
            .filter(|r| after_seq.is_none_or(|seq| r.sequence > seq))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_campaign_records(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<RecipientRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .records
            .get(campaign_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_record_by_code(
        &self,
        campaign_id: &str,
        institution_code: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.records.get(campaign_id).and_then(|list| {
            list.iter()
                .find(|r| r.institution_code == institution_code)
                .cloned()
        }))
    }

    async fn find_record_by_email(
        &self,
        campaign_id: &str,
        email: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.records.get(campaign_id).and_then(|list| {
            list.iter()
                .find(|r| r.recipient_email.eq_ignore_ascii_case(email))
                .cloned()
        }))
    }

    async fn mark_sent(
        &self,
        campaign_id: &str,
        record_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.failing_marks.contains(record_id) {
            return Err(StoreError::backend(std::io::Error::other(format!(
                "mark_sent failed for {record_id}"
            ))));
        }
        let record = inner
            .records
            .get_mut(campaign_id)
            .and_then(|list| list.iter_mut().find(|r| r.record_id == record_id))
            .ok_or_else(|| StoreError::not_found("recipient record", record_id))?;
        if record.email_sent {
            return Ok(false);
        }
        record.email_sent = true;
        record.sent_at = Some(sent_at);
        Ok(true)
    }

    async fn delete_campaign_records(&self, campaign_id: &str) -> Result<u64, StoreError> {
        let removed = self.inner.lock().await.records.remove(campaign_id);
        Ok(removed.map_or(0, |list| list.len() as u64))
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn insert_batch(&self, batch: &Batch) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let key = batch_key(&batch.campaign_id, batch.batch_number);
        if inner.batches.contains_key(&key) {
            return Ok(false);
        }
        inner.batches.insert(key, batch.clone());
        Ok(true)
    }

    async fn get_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
    ) -> Result<Option<Batch>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .batches
            .get(&batch_key(campaign_id, batch_number))
            .cloned())
    }

    async fn list_batches(&self, campaign_id: &str) -> Result<Vec<Batch>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .batches
            .values()
            .filter(|b| b.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn claim_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Batch, StoreError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get_mut(&batch_key(campaign_id, batch_number))
            .ok_or_else(|| missing_batch(campaign_id, batch_number))?;
        if !batch.is_claimable(now) {
            return Err(StoreError::Conflict(format!(
                "batch {batch_number} of campaign {campaign_id} is {} and not claimable",
                batch.status
            )));
        }
        batch.status = BatchStatus::Sending;
        batch.started_at.get_or_insert(now);
        batch.completed_at = None;
        batch.error_message = None;
        batch.lease_expires_at = Some(lease_until);
        Ok(batch.clone())
    }

    async fn record_progress(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
        progress_percent: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get_mut(&batch_key(campaign_id, batch_number))
            .ok_or_else(|| missing_batch(campaign_id, batch_number))?;
        batch.emails_sent = emails_sent;
        batch.failed_emails = failed_emails;
        batch.progress_percent = progress_percent;
        Ok(())
    }

    async fn complete_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get_mut(&batch_key(campaign_id, batch_number))
            .ok_or_else(|| missing_batch(campaign_id, batch_number))?;
        batch.status = BatchStatus::Completed;
        batch.emails_sent = emails_sent;
        batch.failed_emails = failed_emails;
        batch.progress_percent = progress_percent(emails_sent, failed_emails, batch.total_emails);
        batch.completed_at = Some(Utc::now());
        batch.lease_expires_at = None;
        Ok(())
    }

    async fn fail_batch(
        &self,
        campaign_id: &str,
        batch_number: u32,
        emails_sent: u32,
        failed_emails: u32,
        error_message: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get_mut(&batch_key(campaign_id, batch_number))
            .ok_or_else(|| missing_batch(campaign_id, batch_number))?;
        batch.status = BatchStatus::Failed;
        batch.emails_sent = emails_sent;
        batch.failed_emails = failed_emails;
        batch.error_message = Some(error_message.to_string());
        batch.completed_at = Some(Utc::now());
        batch.lease_expires_at = None;
        Ok(())
    }

    async fn delete_campaign_batches(&self, campaign_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.batches.len();
        inner.batches.retain(|(cid, _), _| cid != campaign_id);
        Ok((before - inner.batches.len()) as u64)
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get_template(
        &self,
        campaign_id: &str,
    ) -> Result<Option<TemplateInstance>, StoreError> {
        Ok(self.inner.lock().await.templates.get(campaign_id).cloned())
    }

    async fn put_template(&self, template: &TemplateInstance) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .templates
            .insert(template.campaign_id.clone(), template.clone());
        Ok(())
    }

    async fn delete_template(&self, campaign_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .templates
            .remove(campaign_id)
            .is_some())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn recipients_for_code(
        &self,
        institution_code: &str,
    ) -> Result<Vec<Recipient>, StoreError> {
        let inner = self.inner.lock().await;
        if inner.failing_codes.contains(institution_code) {
            return Err(StoreError::backend(std::io::Error::other(format!(
                "recipient lookup failed for {institution_code}"
            ))));
        }
        Ok(inner
            .recipients
            .values()
            .filter(|r| r.institution_code == institution_code)
            .cloned()
            .collect())
    }

    async fn institution_directory(
        &self,
    ) -> Result<HashMap<String, InstitutionInfo>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .institutions
            .values()
            .map(|info| (info.code.clone(), info.clone()))
            .collect())
    }

    async fn list_institutions(&self) -> Result<Vec<InstitutionInfo>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .institutions
            .values()
            .cloned()
            .collect())
    }

    async fn upsert_institution(&self, info: &InstitutionInfo) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .institutions
            .insert(info.name.clone(), info.clone());
        Ok(())
    }

    async fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .recipients
            .insert(recipient.email.clone(), recipient.clone());
        Ok(())
    }

    async fn list_recipients(
        &self,
        after_email: Option<&str>,
        limit: usize,
    ) -> Result<RecipientPage, StoreError> {
        let inner = self.inner.lock().await;
        let mut source_counts = BTreeMap::new();
        for r in inner.recipients.values() {
            let source = r.source.clone().unwrap_or_else(|| "unknown".to_string());
            *source_counts.entry(source).or_insert(0) += 1;
        }
        let recipients: Vec<Recipient> = inner
            .recipients
            .values()
            .filter(|r| after_email.is_none_or(|after| r.email.as_str() > after))
            .take(limit)
            .cloned()
            .collect();
        let next_key = if recipients.len() == limit {
            recipients.last().map(|r| r.email.clone())
        } else {
            None
        };
        Ok(RecipientPage {
            recipients,
            next_key,
            source_counts,
        })
    }
}

#[async_trait]
impl TestAccountStore for MemoryStore {
    async fn list_test_accounts(&self) -> Result<Vec<TestAccount>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .test_accounts
            .values()
            .cloned()
            .collect())
    }

    async fn upsert_test_account(&self, account: &TestAccount) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .test_accounts
            .insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn delete_test_account(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .test_accounts
            .remove(email)
            .is_some())
    }
}

/// Blob store backed by a map; `public_url` uses a fixed fake host.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().await.get(key).map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|(body, _)| body.clone())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        self.objects.lock().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://blobs.invalid/{key}")
    }
}
