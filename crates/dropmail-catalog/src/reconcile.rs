//! Rebuilding batch markers from stored records after a partial fan-out.

use std::collections::BTreeMap;

use dropmail_core::{Batch, BatchStore, RecordStore};

use crate::error::CatalogError;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    /// Batch numbers whose markers were missing and have been written.
    pub created: Vec<u32>,
    /// Batch numbers that already had a marker.
    pub existing: Vec<u32>,
}

/// Writes a `ready` marker for every batch number that has records but no
/// marker. Existing markers are never modified, so this is safe to rerun.
///
/// # Errors
///
/// Returns [`CatalogError::Store`] on any store failure.
pub async fn reconcile_batches<S>(
    store: &S,
    campaign_id: &str,
) -> Result<ReconcileReport, CatalogError>
where
    S: RecordStore + BatchStore + ?Sized,
{
    let records = store.list_campaign_records(campaign_id).await?;

    let mut counts: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
    for record in &records {
        let entry = counts.entry(record.batch_number).or_default();
        entry.0 += 1;
        if record.email_sent {
            entry.1 += 1;
        }
    }

    let mut report = ReconcileReport::default();
    for (batch_number, (total, sent)) in counts {
        if store.get_batch(campaign_id, batch_number).await?.is_some() {
            report.existing.push(batch_number);
            continue;
        }
        let mut batch = Batch::ready(campaign_id, batch_number, total);
        batch.emails_sent = sent;
        batch.progress_percent = dropmail_core::progress_percent(sent, 0, total);
        if store.insert_batch(&batch).await? {
            tracing::info!(
                campaign_id = %campaign_id,
                batch_number,
                total_emails = total,
                "restored missing batch marker"
            );
            report.created.push(batch_number);
        } else {
            report.existing.push(batch_number);
        }
    }
    Ok(report)
}
