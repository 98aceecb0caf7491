use chrono::{DateTime, Utc};
use dropmail_core::{progress_percent, Batch};
use sqlx::PgPool;

use crate::{from_db_int, to_db_int, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchRow {
    pub campaign_id: String,
    pub batch_number: i32,
    pub status: String,
    pub total_emails: i32,
    pub emails_sent: i32,
    pub failed_emails: i32,
    pub progress_percent: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<BatchRow> for Batch {
    type Error = DbError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| DbError::InvalidColumn {
            column: "campaign_batches.status",
            reason: row.status.clone(),
        })?;
        Ok(Batch {
            campaign_id: row.campaign_id,
            batch_number: from_db_int(row.batch_number, "campaign_batches.batch_number")?,
            status,
            total_emails: from_db_int(row.total_emails, "campaign_batches.total_emails")?,
            emails_sent: from_db_int(row.emails_sent, "campaign_batches.emails_sent")?,
            failed_emails: from_db_int(row.failed_emails, "campaign_batches.failed_emails")?,
            progress_percent: from_db_int(
                row.progress_percent,
                "campaign_batches.progress_percent",
            )?,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            lease_expires_at: row.lease_expires_at,
        })
    }
}

const BATCH_COLUMNS: &str = "campaign_id, batch_number, status, total_emails, emails_sent, \
     failed_emails, progress_percent, error_message, created_at, started_at, completed_at, \
     lease_expires_at";

fn missing_batch(campaign_id: &str, batch_number: u32) -> DbError {
    DbError::NotFound {
        entity: "batch",
        key: format!("{campaign_id}#{batch_number}"),
    }
}

// ---------------------------------------------------------------------------
// Batch functions
// ---------------------------------------------------------------------------

/// Write a batch marker unless one already exists.
///
/// Returns `true` if the marker was created.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn insert_batch(pool: &PgPool, batch: &Batch) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO campaign_batches \
             (campaign_id, batch_number, status, total_emails, emails_sent, failed_emails, \
              progress_percent, error_message, created_at, started_at, completed_at, \
              lease_expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (campaign_id, batch_number) DO NOTHING",
    )
    .bind(&batch.campaign_id)
    .bind(to_db_int(batch.batch_number, "campaign_batches.batch_number")?)
    .bind(batch.status.as_str())
    .bind(to_db_int(batch.total_emails, "campaign_batches.total_emails")?)
    .bind(to_db_int(batch.emails_sent, "campaign_batches.emails_sent")?)
    .bind(to_db_int(batch.failed_emails, "campaign_batches.failed_emails")?)
    .bind(to_db_int(batch.progress_percent, "campaign_batches.progress_percent")?)
    .bind(batch.error_message.as_deref())
    .bind(batch.created_at)
    .bind(batch.started_at)
    .bind(batch.completed_at)
    .bind(batch.lease_expires_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch one batch marker.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_batch(
    pool: &PgPool,
    campaign_id: &str,
    batch_number: u32,
) -> Result<Option<Batch>, DbError> {
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM campaign_batches \
         WHERE campaign_id = $1 AND batch_number = $2"
    ))
    .bind(campaign_id)
    .bind(to_db_int(batch_number, "campaign_batches.batch_number")?)
    .fetch_optional(pool)
    .await?;

    row.map(Batch::try_from).transpose()
}

/// All batch markers of a campaign, by batch number.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_batches(pool: &PgPool, campaign_id: &str) -> Result<Vec<Batch>, DbError> {
    let rows = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM campaign_batches \
         WHERE campaign_id = $1 \
         ORDER BY batch_number"
    ))
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Batch::try_from).collect()
}

/// Move a claimable batch to `sending` and take the lease in one statement.
///
/// Claimable: `ready`; `sending` with no lease or a lapsed one; `completed`
/// with failed sends left to retry.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the batch does not exist, or
/// [`DbError::Conflict`] if it exists but is held or terminal.
pub async fn claim_batch(
    pool: &PgPool,
    campaign_id: &str,
    batch_number: u32,
    now: DateTime<Utc>,
    lease_until: DateTime<Utc>,
) -> Result<Batch, DbError> {
    let number = to_db_int(batch_number, "campaign_batches.batch_number")?;
    let claimed = sqlx::query_as::<_, BatchRow>(&format!(
        "UPDATE campaign_batches \
         SET status = 'sending', \
             started_at = COALESCE(started_at, $3), \
             completed_at = NULL, \
             error_message = NULL, \
             lease_expires_at = $4 \
         WHERE campaign_id = $1 \
           AND batch_number = $2 \
           AND (status = 'ready' \
                OR (status = 'sending' AND (lease_expires_at IS NULL OR lease_expires_at <= $3)) \
                OR (status = 'completed' AND failed_emails > 0)) \
         RETURNING {BATCH_COLUMNS}"
    ))
    .bind(campaign_id)
    .bind(number)
    .bind(now)
    .bind(lease_until)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = claimed {
        tracing::debug!(campaign_id, batch_number, %lease_until, "batch claimed");
        return Batch::try_from(row);
    }

    match get_batch(pool, campaign_id, batch_number).await? {
        Some(batch) => Err(DbError::Conflict(format!(
            "batch {batch_number} of campaign {campaign_id} is {} and not claimable",
            batch.status
        ))),
        None => Err(missing_batch(campaign_id, batch_number)),
    }
}

/// Write intermediate counters for a batch in flight.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the batch does not exist.
pub async fn record_batch_progress(
    pool: &PgPool,
    campaign_id: &str,
    batch_number: u32,
    emails_sent: u32,
    failed_emails: u32,
    progress: u32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaign_batches \
         SET emails_sent = $3, failed_emails = $4, progress_percent = $5 \
         WHERE campaign_id = $1 AND batch_number = $2",
    )
    .bind(campaign_id)
    .bind(to_db_int(batch_number, "campaign_batches.batch_number")?)
    .bind(to_db_int(emails_sent, "campaign_batches.emails_sent")?)
    .bind(to_db_int(failed_emails, "campaign_batches.failed_emails")?)
    .bind(to_db_int(progress.min(100), "campaign_batches.progress_percent")?)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(missing_batch(campaign_id, batch_number));
    }
    Ok(())
}

/// Mark a batch `completed` with its final counters and release the lease.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the batch does not exist.
pub async fn complete_batch(
    pool: &PgPool,
    campaign_id: &str,
    batch_number: u32,
    emails_sent: u32,
    failed_emails: u32,
) -> Result<(), DbError> {
    let Some(batch) = get_batch(pool, campaign_id, batch_number).await? else {
        return Err(missing_batch(campaign_id, batch_number));
    };
    let progress = progress_percent(emails_sent, failed_emails, batch.total_emails);

    let result = sqlx::query(
        "UPDATE campaign_batches \
         SET status = 'completed', \
             emails_sent = $3, \
             failed_emails = $4, \
             progress_percent = $5, \
             completed_at = NOW(), \
             lease_expires_at = NULL \
         WHERE campaign_id = $1 AND batch_number = $2",
    )
    .bind(campaign_id)
    .bind(to_db_int(batch_number, "campaign_batches.batch_number")?)
    .bind(to_db_int(emails_sent, "campaign_batches.emails_sent")?)
    .bind(to_db_int(failed_emails, "campaign_batches.failed_emails")?)
    .bind(to_db_int(progress, "campaign_batches.progress_percent")?)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(missing_batch(campaign_id, batch_number));
    }
    Ok(())
}

/// Mark a batch `failed` with an error message and release the lease.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the batch does not exist.
pub async fn fail_batch(
    pool: &PgPool,
    campaign_id: &str,
    batch_number: u32,
    emails_sent: u32,
    failed_emails: u32,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaign_batches \
         SET status = 'failed', \
             emails_sent = $3, \
             failed_emails = $4, \
             error_message = $5, \
             completed_at = NOW(), \
             lease_expires_at = NULL \
         WHERE campaign_id = $1 AND batch_number = $2",
    )
    .bind(campaign_id)
    .bind(to_db_int(batch_number, "campaign_batches.batch_number")?)
    .bind(to_db_int(emails_sent, "campaign_batches.emails_sent")?)
    .bind(to_db_int(failed_emails, "campaign_batches.failed_emails")?)
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(missing_batch(campaign_id, batch_number));
    }
    Ok(())
}

/// Delete every batch marker of a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn delete_campaign_batches(pool: &PgPool, campaign_id: &str) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM campaign_batches WHERE campaign_id = $1")
        .bind(campaign_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
