//! The batch dispatch loop.

use std::time::Duration;

use chrono::Utc;
use dropmail_core::{
    progress_percent, AppConfig, BatchStatus, CampaignStatus, RecipientRecord, Store,
    TemplateConfig,
};
use dropmail_template::{
    base_subject, personalized_subject, render_personalized, validate_template,
    STANDARD_TEMPLATE,
};
use serde::Serialize;
use tokio::time::Instant;

use crate::error::DispatchError;
use crate::provider::{EmailProvider, OutgoingEmail};
use crate::test_send::send_test;

const RECORD_PAGE_SIZE: usize = 100;
const PROGRESS_EVERY: u32 = 10;
/// Added to the batch timeout so a lease outlives any run that honours it.
const LEASE_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub sender_email: String,
    pub reply_to: String,
    /// Sends between one-second pauses.
    pub emails_per_second: u32,
    pub batch_timeout: Duration,
    pub test_fallback_codes: Vec<String>,
}

impl DispatchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            sender_email: config.sender_email.clone(),
            reply_to: config.reply_to.clone(),
            emails_per_second: config.emails_per_second,
            batch_timeout: Duration::from_secs(config.batch_timeout_secs),
            test_fallback_codes: config.test_fallback_codes.clone(),
        }
    }

    fn lease(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.batch_timeout + LEASE_MARGIN)
            .unwrap_or_else(|_| chrono::Duration::hours(1))
    }

    pub(crate) fn outgoing(&self, to: &str, subject: String, html_body: String) -> OutgoingEmail {
        OutgoingEmail {
            from: self.sender_email.clone(),
            to: to.to_string(),
            reply_to: self.reply_to.clone(),
            subject,
            html_body,
        }
    }
}

/// Counts from one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// Sent during this run.
    pub emails_sent: u32,
    pub failed_emails: u32,
    /// Delivered this run, but the record's sent flag could not be written.
    /// Included in `emails_sent`.
    pub unmarked_emails: u32,
    pub total_recipients: u32,
    /// The run stopped at the wall-clock ceiling; the batch is left `sending`.
    pub timed_out: bool,
}

/// Template HTML and config the campaign's emails are rendered from.
pub(crate) struct Rendering {
    pub html: String,
    pub config: TemplateConfig,
}

pub(crate) async fn load_rendering<S: Store + ?Sized>(
    store: &S,
    campaign_id: &str,
) -> Result<Rendering, DispatchError> {
    let campaign = store
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| DispatchError::CampaignNotFound(campaign_id.to_string()))?;

    Ok(match store.get_template(campaign_id).await? {
        Some(template) => {
            validate_template(&template.template_html_raw)?;
            Rendering {
                html: template.template_html_raw,
                config: template.template_config,
            }
        }
        None => Rendering {
            html: STANDARD_TEMPLATE.to_string(),
            config: campaign.template_config,
        },
    })
}

/// Sends every unsent record of one batch.
///
/// With `is_test` the batch is left untouched and the campaign's active test
/// accounts receive a preview instead; see [`send_test`].
///
/// # Errors
///
/// Returns [`DispatchError::CampaignNotFound`] for an unknown campaign,
/// [`DispatchError::Template`] when the stored template references an unknown
/// placeholder, and
/// [`DispatchError::Store`] when the batch cannot be claimed (missing or held
/// by another dispatcher) or its state cannot be written. After a successful
/// claim, store failures also mark the batch `failed`.
pub async fn send_batch<S: Store + ?Sized>(
    store: &S,
    provider: &dyn EmailProvider,
    config: &DispatchConfig,
    campaign_id: &str,
    batch_number: u32,
    is_test: bool,
) -> Result<DispatchOutcome, DispatchError> {
    if is_test {
        let results = send_test(store, provider, config, campaign_id).await?;
        let sent = u32::try_from(results.iter().filter(|r| r.sent).count()).unwrap_or(u32::MAX);
        let total = u32::try_from(results.len()).unwrap_or(u32::MAX);
        return Ok(DispatchOutcome {
            emails_sent: sent,
            failed_emails: total - sent,
            unmarked_emails: 0,
            total_recipients: total,
            timed_out: false,
        });
    }

    let rendering = load_rendering(store, campaign_id).await?;

    let now = Utc::now();
    let batch = store
        .claim_batch(campaign_id, batch_number, now, now + config.lease())
        .await?;
    store
        .set_campaign_status(campaign_id, CampaignStatus::Sending)
        .await?;
    tracing::info!(campaign_id, batch_number, total = batch.total_emails, "batch claimed");

    let mut tally = Tally::default();
    let result = run_batch(
        store,
        provider,
        config,
        &rendering,
        campaign_id,
        batch_number,
        &mut tally,
    )
    .await;

    match result {
        Ok(outcome) => {
            settle_campaign_status(store, campaign_id).await?;
            Ok(outcome)
        }
        Err(e) => {
            tracing::error!(campaign_id, batch_number, error = %e, "batch dispatch failed");
            if let Err(mark_err) = store
                .fail_batch(
                    campaign_id,
                    batch_number,
                    tally.already_sent + tally.sent,
                    tally.failed,
                    &e.to_string(),
                )
                .await
            {
                tracing::error!(
                    campaign_id,
                    batch_number,
                    error = %mark_err,
                    "failed to mark batch failed"
                );
            }
            if tally.sent > 0 {
                if let Err(add_err) = store.add_emails_sent(campaign_id, tally.sent).await {
                    tracing::error!(campaign_id, error = %add_err, "failed to add sent count");
                }
            }
            if let Err(settle_err) = settle_campaign_status(store, campaign_id).await {
                tracing::error!(campaign_id, error = %settle_err, "failed to settle campaign status");
            }
            Err(e)
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    already_sent: u32,
    sent: u32,
    failed: u32,
    unmarked: u32,
}

async fn run_batch<S: Store + ?Sized>(
    store: &S,
    provider: &dyn EmailProvider,
    config: &DispatchConfig,
    rendering: &Rendering,
    campaign_id: &str,
    batch_number: u32,
    tally: &mut Tally,
) -> Result<DispatchOutcome, DispatchError> {
    let started = Instant::now();
    let records = load_batch_records(store, campaign_id, batch_number).await?;
    let total = u32::try_from(records.len()).unwrap_or(u32::MAX);
    tally.already_sent =
        u32::try_from(records.iter().filter(|r| r.email_sent).count()).unwrap_or(u32::MAX);

    store
        .record_progress(
            campaign_id,
            batch_number,
            tally.already_sent,
            0,
            progress_percent(tally.already_sent, 0, total),
        )
        .await?;

    let subject_base = base_subject(&rendering.config);
    let per_second = config.emails_per_second.max(1);
    let mut attempts: u32 = 0;
    let mut timed_out = false;

    for record in records.iter().filter(|r| !r.email_sent) {
        if started.elapsed() >= config.batch_timeout {
            tracing::warn!(
                campaign_id,
                batch_number,
                elapsed_secs = started.elapsed().as_secs(),
                "batch timeout reached; leaving batch in sending"
            );
            timed_out = true;
            break;
        }

        let email = config.outgoing(
            &record.recipient_email,
            personalized_subject(subject_base, record),
            render_personalized(&rendering.html, &rendering.config, record),
        );

        match provider.send(&email).await {
            Ok(_) => {
                tally.sent += 1;
                if let Err(e) = store
                    .mark_sent(campaign_id, &record.record_id, Utc::now())
                    .await
                {
                    tracing::error!(
                        campaign_id,
                        record_id = %record.record_id,
                        error = %e,
                        "email delivered but not marked sent"
                    );
                    tally.unmarked += 1;
                }
            }
            Err(e) => {
                tracing::warn!(
                    campaign_id,
                    record_id = %record.record_id,
                    error = %e,
                    "send failed"
                );
                tally.failed += 1;
            }
        }
        attempts += 1;

        if attempts % PROGRESS_EVERY == 0 {
            let sent = tally.already_sent + tally.sent;
            store
                .record_progress(
                    campaign_id,
                    batch_number,
                    sent,
                    tally.failed,
                    progress_percent(sent, tally.failed, total),
                )
                .await?;
        }
        if attempts % per_second == 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    let sent = tally.already_sent + tally.sent;
    if timed_out {
        store
            .record_progress(
                campaign_id,
                batch_number,
                sent,
                tally.failed,
                progress_percent(sent, tally.failed, total),
            )
            .await?;
    } else {
        store
            .complete_batch(campaign_id, batch_number, sent, tally.failed)
            .await?;
    }
    if tally.sent > 0 {
        store.add_emails_sent(campaign_id, tally.sent).await?;
    }

    tracing::info!(
        campaign_id,
        batch_number,
        sent = tally.sent,
        failed = tally.failed,
        unmarked = tally.unmarked,
        skipped = tally.already_sent,
        timed_out,
        "batch dispatch finished"
    );

    Ok(DispatchOutcome {
        emails_sent: tally.sent,
        failed_emails: tally.failed,
        unmarked_emails: tally.unmarked,
        total_recipients: total,
        timed_out,
    })
}

async fn load_batch_records<S: Store + ?Sized>(
    store: &S,
    campaign_id: &str,
    batch_number: u32,
) -> Result<Vec<RecipientRecord>, DispatchError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store
            .list_batch_records(campaign_id, batch_number, cursor.as_deref(), RECORD_PAGE_SIZE)
            .await?;
        let done = page.len() < RECORD_PAGE_SIZE;
        cursor = page.last().map(|r| r.record_id.clone());
        records.extend(page);
        if done || cursor.is_none() {
            return Ok(records);
        }
    }
}

/// Derives the campaign status from its batches once a run ends.
///
/// Any batch still `sending` keeps the campaign `sending`; all batches
/// `completed` makes it `completed`; otherwise it returns to `ready`.
async fn settle_campaign_status<S: Store + ?Sized>(
    store: &S,
    campaign_id: &str,
) -> Result<(), DispatchError> {
    let batches = store.list_batches(campaign_id).await?;
    let status = if batches.iter().any(|b| b.status == BatchStatus::Sending) {
        CampaignStatus::Sending
    } else if !batches.is_empty() && batches.iter().all(|b| b.status == BatchStatus::Completed) {
        CampaignStatus::Completed
    } else {
        CampaignStatus::Ready
    };
    store.set_campaign_status(campaign_id, status).await?;
    Ok(())
}
