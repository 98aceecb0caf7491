//! Expanding per-institution product lists into one record per recipient,
//! persisted in fixed-size batches.

use chrono::Utc;
use dropmail_core::{
    Batch, BatchStore, DirectoryStore, ProductSlot, Recipient, RecipientRecord, RecordStore,
    MAX_PRODUCT_SLOTS,
};

use crate::enrich::CodeGroup;
use crate::error::CatalogError;

pub const DEFAULT_BATCH_SIZE: usize = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutSummary {
    pub total_records: u32,
    pub total_batches: u32,
    /// Codes whose recipients were fetched successfully.
    pub institutions_processed: usize,
}

/// Accumulates records for the batch currently being filled.
struct BatchWriter<'a, S: ?Sized> {
    store: &'a S,
    campaign_id: &'a str,
    batch_size: usize,
    batch_number: u32,
    buffer: Vec<RecipientRecord>,
    written_batches: u32,
}

impl<'a, S> BatchWriter<'a, S>
where
    S: RecordStore + BatchStore + ?Sized,
{
    fn new(store: &'a S, campaign_id: &'a str, batch_size: usize) -> Self {
        Self {
            store,
            campaign_id,
            batch_size: batch_size.max(1),
            batch_number: 1,
            buffer: Vec::new(),
            written_batches: 0,
        }
    }

    async fn push(&mut self, record: RecipientRecord) -> Result<(), CatalogError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), CatalogError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.store.put_records(&self.buffer).await?;

        let total = u32::try_from(self.buffer.len()).unwrap_or(u32::MAX);
        let batch = Batch::ready(self.campaign_id, self.batch_number, total);
        if !self.store.insert_batch(&batch).await? {
            tracing::warn!(
                campaign_id = %self.campaign_id,
                batch_number = self.batch_number,
                "batch marker already existed; left unchanged"
            );
        }
        tracing::debug!(
            campaign_id = %self.campaign_id,
            batch_number = self.batch_number,
            records = total,
            "wrote batch"
        );

        self.written_batches = self.batch_number;
        self.batch_number += 1;
        self.buffer.clear();
        Ok(())
    }
}

fn product_slots(group: &CodeGroup) -> Vec<ProductSlot> {
    group
        .products
        .iter()
        .take(MAX_PRODUCT_SLOTS)
        .map(|p| ProductSlot {
            link: p.product_link.clone(),
            image: p.product.image_url.clone(),
            price: p.product.price.clone(),
            name: p.product.title.clone(),
        })
        .collect()
}

fn build_record(
    campaign_id: &str,
    sequence: u64,
    batch_number: u32,
    group: &CodeGroup,
    slots: &[ProductSlot],
    recipient: &Recipient,
) -> RecipientRecord {
    let first = group.products.first();
    RecipientRecord {
        campaign_id: campaign_id.to_string(),
        record_id: RecipientRecord::record_id_for(campaign_id, sequence),
        sequence,
        batch_number,
        recipient_email: recipient.email.clone(),
        recipient_name: recipient.display_name.clone(),
        institution_code: group.code.clone(),
        institution_name: first.map(|p| p.institution_name.clone()).unwrap_or_default(),
        products: slots.to_vec(),
        institution_page_url: first.map(|p| p.landing_page_url.clone()).unwrap_or_default(),
        institution_logo_url: first.map(|p| p.logo_url.clone()).unwrap_or_default(),
        email_sent: false,
        sent_at: None,
        created_at: Utc::now(),
    }
}

/// Writes one record per recipient of every institution in `groups`, cut
/// into batches of `batch_size` and a `ready` marker per batch.
///
/// A failed recipient lookup skips that institution; store write failures
/// abort the fan-out.
///
/// # Errors
///
/// Returns [`CatalogError::Store`] when records or batch markers cannot be
/// written.
pub async fn fan_out<S>(
    store: &S,
    campaign_id: &str,
    groups: &[CodeGroup],
    batch_size: usize,
) -> Result<FanOutSummary, CatalogError>
where
    S: DirectoryStore + RecordStore + BatchStore + ?Sized,
{
    let mut writer = BatchWriter::new(store, campaign_id, batch_size);
    let mut sequence: u64 = 0;
    let mut institutions_processed = 0;

    for group in groups.iter().filter(|g| !g.products.is_empty()) {
        let recipients = match store.recipients_for_code(&group.code).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    campaign_id = %campaign_id,
                    institution_code = %group.code,
                    error = %e,
                    "recipient lookup failed; skipping institution"
                );
                continue;
            }
        };
        institutions_processed += 1;
        tracing::info!(
            institution_code = %group.code,
            recipients = recipients.len(),
            products = group.products.len(),
            "fanning out institution"
        );

        let slots = product_slots(group);
        for recipient in &recipients {
            let record = build_record(
                campaign_id,
                sequence,
                writer.batch_number,
                group,
                &slots,
                recipient,
            );
            sequence += 1;
            writer.push(record).await?;
        }
    }
    writer.flush().await?;

    Ok(FanOutSummary {
        total_records: u32::try_from(sequence).unwrap_or(u32::MAX),
        total_batches: writer.written_batches,
        institutions_processed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropmail_core::memory::MemoryStore;
    use dropmail_core::{BatchStatus, EnrichedProduct, ProductRow};

    fn product(handle: &str, code: &str) -> EnrichedProduct {
        EnrichedProduct {
            product: ProductRow {
                handle: handle.to_string(),
                title: handle.to_string(),
                sku: format!("{handle}-C-{code}1"),
                option1_name: "Size".to_string(),
                option1_value: "One".to_string(),
                option2_name: None,
                option2_value: None,
                price: "10.00".to_string(),
                image_url: format!("https://img.example.com/{handle}.png"),
            },
            institution_code: code.to_string(),
            institution_name: format!("{code} University"),
            landing_page_url: format!("https://shop.example.com/collections/{code}"),
            logo_url: format!("https://img.example.com/{code}-logo.png"),
            product_link: format!("https://shop.example.com/products/{handle}"),
            matched: true,
        }
    }

    async fn seed_recipients(store: &MemoryStore, code: &str, count: usize) {
        for i in 0..count {
            store
                .upsert_recipient(&Recipient {
                    email: format!("{}{i:04}@example.com", code.to_lowercase()),
                    display_name: format!("Fan {i}"),
                    institution_code: code.to_string(),
                    source: None,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn batches_are_full_except_the_last() {
        let store = MemoryStore::new();
        seed_recipients(&store, "RAD", 7).await;
        let groups = vec![CodeGroup {
            code: "RAD".to_string(),
            products: vec![product("tee", "RAD")],
        }];

        let summary = fan_out(&store, "c1", &groups, 3).await.unwrap();
        assert_eq!(summary.total_records, 7);
        assert_eq!(summary.total_batches, 3);

        let batches = store.list_batches("c1").await.unwrap();
        let sizes: Vec<u32> = batches.iter().map(|b| b.total_emails).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert!(batches.iter().all(|b| b.status == BatchStatus::Ready));
    }

    #[tokio::test]
    async fn exact_multiple_has_no_empty_trailing_batch() {
        let store = MemoryStore::new();
        seed_recipients(&store, "RAD", 4).await;
        let groups = vec![CodeGroup {
            code: "RAD".to_string(),
            products: vec![product("tee", "RAD")],
        }];

        let summary = fan_out(&store, "c1", &groups, 2).await.unwrap();
        assert_eq!(summary.total_batches, 2);
        assert_eq!(store.list_batches("c1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn records_carry_ids_batches_and_at_most_four_products() {
        let store = MemoryStore::new();
        seed_recipients(&store, "BAY", 3).await;
        let groups = vec![CodeGroup {
            code: "BAY".to_string(),
            products: (1..=6).map(|i| product(&format!("p{i}"), "BAY")).collect(),
        }];

        fan_out(&store, "c9", &groups, 2).await.unwrap();
        let records = store.list_campaign_records("c9").await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["c9_0", "c9_1", "c9_2"]);
        let batch_numbers: Vec<_> = records.iter().map(|r| r.batch_number).collect();
        assert_eq!(batch_numbers, vec![1, 1, 2]);

        let first = &records[0];
        assert_eq!(first.products.len(), MAX_PRODUCT_SLOTS);
        assert_eq!(first.products[0].link, "https://shop.example.com/products/p1");
        assert_eq!(first.institution_name, "BAY University");
        assert_eq!(first.institution_page_url, "https://shop.example.com/collections/BAY");
        assert!(!first.email_sent);
    }

    #[tokio::test]
    async fn failed_lookup_skips_only_that_institution() {
        let store = MemoryStore::new();
        seed_recipients(&store, "RAD", 2).await;
        seed_recipients(&store, "BAY", 2).await;
        store.fail_recipient_lookup("RAD").await;
        let groups = vec![
            CodeGroup {
                code: "RAD".to_string(),
                products: vec![product("tee", "RAD")],
            },
            CodeGroup {
                code: "BAY".to_string(),
                products: vec![product("mug", "BAY")],
            },
        ];

        let summary = fan_out(&store, "c1", &groups, 10).await.unwrap();
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.institutions_processed, 1);
        let records = store.list_campaign_records("c1").await.unwrap();
        assert!(records.iter().all(|r| r.institution_code == "BAY"));
    }

    #[tokio::test]
    async fn no_recipients_writes_nothing() {
        let store = MemoryStore::new();
        let groups = vec![CodeGroup {
            code: "RAD".to_string(),
            products: vec![product("tee", "RAD")],
        }];
        let summary = fan_out(&store, "c1", &groups, 10).await.unwrap();
        assert_eq!(summary, FanOutSummary { total_records: 0, total_batches: 0, institutions_processed: 1 });
        assert!(store.list_batches("c1").await.unwrap().is_empty());
    }
}
