//! Turning an uploaded catalog into recipient records and batches.

use chrono::Utc;
use dropmail_core::{BlobStore, CampaignStatus, Store};
use serde::Serialize;

use crate::dedupe::dedupe;
use crate::enrich::{enrich, filter_sendable, group_by_code};
use crate::error::CatalogError;
use crate::fanout::{fan_out, DEFAULT_BATCH_SIZE};
use crate::parse::read_catalog;

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub batch_size: usize,
    /// Prefix for product links; the product handle is appended.
    pub product_base_url: String,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            product_base_url: "https://www.rrinconline.com/products/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub total_batches: u32,
    pub total_records: u32,
    pub schools_processed: usize,
    /// Institutions left out because their recipient lookup failed.
    pub schools_skipped: usize,
    pub products_found: usize,
}

/// Runs the full catalog pipeline for one campaign and marks it `ready`.
///
/// Any records and batches from an earlier run are deleted first.
///
/// # Errors
///
/// - [`CatalogError::CampaignNotFound`] / [`CatalogError::NoCatalog`] when
///   there is nothing to process.
/// - [`CatalogError::CampaignBusy`] while the campaign is sending.
/// - Parse, blob and store errors as they occur.
pub async fn process_campaign<S, B>(
    store: &S,
    blobs: &B,
    campaign_id: &str,
    options: &ProcessOptions,
) -> Result<ProcessSummary, CatalogError>
where
    S: Store + ?Sized,
    B: BlobStore + ?Sized,
{
    let mut campaign = store
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| CatalogError::CampaignNotFound(campaign_id.to_string()))?;
    if campaign.status == CampaignStatus::Sending {
        return Err(CatalogError::CampaignBusy(campaign_id.to_string()));
    }
    let key = campaign
        .file_s3_key
        .clone()
        .ok_or_else(|| CatalogError::NoCatalog(campaign_id.to_string()))?;

    let bytes = blobs.get_object(&key).await?;
    let rows = read_catalog(&bytes)?;
    let directory = store.institution_directory().await?;
    tracing::info!(
        campaign_id = %campaign_id,
        institutions = directory.len(),
        "loaded institution directory"
    );

    let deduped = dedupe(rows);
    let sendable = filter_sendable(enrich(deduped, &directory, &options.product_base_url));
    let groups = group_by_code(sendable);
    let products_found = groups.iter().map(|g| g.products.len()).sum();

    let old_records = store.delete_campaign_records(campaign_id).await?;
    let old_batches = store.delete_campaign_batches(campaign_id).await?;
    if old_records > 0 || old_batches > 0 {
        tracing::info!(
            campaign_id = %campaign_id,
            old_records,
            old_batches,
            "cleared previous processing run"
        );
    }

    let fanned = fan_out(store, campaign_id, &groups, options.batch_size).await?;

    let now = Utc::now();
    campaign.status = CampaignStatus::Ready;
    campaign.batch_count = fanned.total_batches;
    campaign.total_emails = fanned.total_records;
    campaign.emails_sent = 0;
    campaign.file_processed_at = Some(now);
    campaign.updated_at = now;
    store.update_campaign(&campaign).await?;

    let summary = ProcessSummary {
        total_batches: fanned.total_batches,
        total_records: fanned.total_records,
        schools_processed: groups.len(),
        schools_skipped: groups.len().saturating_sub(fanned.institutions_processed),
        products_found,
    };
    tracing::info!(
        campaign_id = %campaign_id,
        total_batches = summary.total_batches,
        total_records = summary.total_records,
        schools = summary.schools_processed,
        schools_skipped = summary.schools_skipped,
        products = summary.products_found,
        "campaign processed"
    );
    Ok(summary)
}
