use chrono::{DateTime, Utc};
use dropmail_core::{ProductSlot, RecipientRecord};
use sqlx::{types::Json, PgPool};

use crate::{from_db_int, to_db_int, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub campaign_id: String,
    pub record_id: String,
    pub sequence: i64,
    pub batch_number: i32,
    pub recipient_email: String,
    pub recipient_name: String,
    pub institution_code: String,
    pub institution_name: String,
    pub products: Json<Vec<ProductSlot>>,
    pub institution_page_url: String,
    pub institution_logo_url: String,
    pub email_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for RecipientRecord {
    type Error = DbError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let sequence = u64::try_from(row.sequence).map_err(|_| DbError::InvalidColumn {
            column: "recipient_records.sequence",
            reason: format!("negative value {}", row.sequence),
        })?;
        Ok(RecipientRecord {
            campaign_id: row.campaign_id,
            record_id: row.record_id,
            sequence,
            batch_number: from_db_int(row.batch_number, "recipient_records.batch_number")?,
            recipient_email: row.recipient_email,
            recipient_name: row.recipient_name,
            institution_code: row.institution_code,
            institution_name: row.institution_name,
            products: row.products.0,
            institution_page_url: row.institution_page_url,
            institution_logo_url: row.institution_logo_url,
            email_sent: row.email_sent,
            sent_at: row.sent_at,
            created_at: row.created_at,
        })
    }
}

const RECORD_COLUMNS: &str = "campaign_id, record_id, sequence, batch_number, recipient_email, \
     recipient_name, institution_code, institution_name, products, institution_page_url, \
     institution_logo_url, email_sent, sent_at, created_at";

fn rows_to_records(rows: Vec<RecordRow>) -> Result<Vec<RecipientRecord>, DbError> {
    rows.into_iter().map(RecipientRecord::try_from).collect()
}

// ---------------------------------------------------------------------------
// Record functions
// ---------------------------------------------------------------------------

/// Upsert a slice of recipient records inside one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on any database error; nothing is written in
/// that case.
pub async fn insert_records(pool: &PgPool, records: &[RecipientRecord]) -> Result<(), DbError> {
    if records.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for record in records {
        let sequence = i64::try_from(record.sequence).map_err(|_| DbError::InvalidColumn {
            column: "recipient_records.sequence",
            reason: format!("{} exceeds BIGINT range", record.sequence),
        })?;
        sqlx::query(
            "INSERT INTO recipient_records \
                 (campaign_id, record_id, sequence, batch_number, recipient_email, \
                  recipient_name, institution_code, institution_name, products, \
                  institution_page_url, institution_logo_url, email_sent, sent_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (campaign_id, record_id) DO UPDATE \
             SET sequence = EXCLUDED.sequence, \
                 batch_number = EXCLUDED.batch_number, \
                 recipient_email = EXCLUDED.recipient_email, \
                 recipient_name = EXCLUDED.recipient_name, \
                 institution_code = EXCLUDED.institution_code, \
                 institution_name = EXCLUDED.institution_name, \
                 products = EXCLUDED.products, \
                 institution_page_url = EXCLUDED.institution_page_url, \
                 institution_logo_url = EXCLUDED.institution_logo_url, \
                 email_sent = EXCLUDED.email_sent, \
                 sent_at = EXCLUDED.sent_at",
        )
        .bind(&record.campaign_id)
        .bind(&record.record_id)
        .bind(sequence)
        .bind(to_db_int(record.batch_number, "recipient_records.batch_number")?)
        .bind(&record.recipient_email)
        .bind(&record.recipient_name)
        .bind(&record.institution_code)
        .bind(&record.institution_name)
        .bind(Json(&record.products))
        .bind(&record.institution_page_url)
        .bind(&record.institution_logo_url)
        .bind(record.email_sent)
        .bind(record.sent_at)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    tracing::debug!(count = records.len(), "recipient records written");
    Ok(())
}

/// One page of a batch's records in fan-out order.
///
/// `after_record_id` is the last record of the previous page; the page
/// starts at the record whose sequence follows it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_batch_records(
    pool: &PgPool,
    campaign_id: &str,
    batch_number: u32,
    after_record_id: Option<&str>,
    limit: usize,
) -> Result<Vec<RecipientRecord>, DbError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = sqlx::query_as::<_, RecordRow>(&format!(
        "SELECT {RECORD_COLUMNS} FROM recipient_records \
         WHERE campaign_id = $1 \
           AND batch_number = $2 \
           AND sequence > COALESCE( \
               (SELECT sequence FROM recipient_records \
                WHERE campaign_id = $1 AND record_id = $3), \
               -1) \
         ORDER BY sequence \
         LIMIT $4"
    ))
    .bind(campaign_id)
    .bind(to_db_int(batch_number, "recipient_records.batch_number")?)
    .bind(after_record_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows_to_records(rows)
}

/// Every record of a campaign in fan-out order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_campaign_records(
    pool: &PgPool,
    campaign_id: &str,
) -> Result<Vec<RecipientRecord>, DbError> {
    let rows = sqlx::query_as::<_, RecordRow>(&format!(
        "SELECT {RECORD_COLUMNS} FROM recipient_records \
         WHERE campaign_id = $1 \
         ORDER BY sequence"
    ))
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    rows_to_records(rows)
}

/// First record carrying `institution_code`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn find_record_by_code(
    pool: &PgPool,
    campaign_id: &str,
    institution_code: &str,
) -> Result<Option<RecipientRecord>, DbError> {
    let row = sqlx::query_as::<_, RecordRow>(&format!(
        "SELECT {RECORD_COLUMNS} FROM recipient_records \
         WHERE campaign_id = $1 AND institution_code = $2 \
         ORDER BY sequence \
         LIMIT 1"
    ))
    .bind(campaign_id)
    .bind(institution_code)
    .fetch_optional(pool)
    .await?;

    row.map(RecipientRecord::try_from).transpose()
}

/// Case-insensitive lookup of a campaign record by recipient email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn find_record_by_email(
    pool: &PgPool,
    campaign_id: &str,
    email: &str,
) -> Result<Option<RecipientRecord>, DbError> {
    let row = sqlx::query_as::<_, RecordRow>(&format!(
        "SELECT {RECORD_COLUMNS} FROM recipient_records \
         WHERE campaign_id = $1 AND lower(recipient_email) = lower($2) \
         ORDER BY sequence \
         LIMIT 1"
    ))
    .bind(campaign_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(RecipientRecord::try_from).transpose()
}

/// Flag a record as sent. Returns `false` when it was already flagged.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the record does not exist.
pub async fn mark_record_sent(
    pool: &PgPool,
    campaign_id: &str,
    record_id: &str,
    sent_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE recipient_records \
         SET email_sent = TRUE, sent_at = $3 \
         WHERE campaign_id = $1 AND record_id = $2 AND NOT email_sent",
    )
    .bind(campaign_id)
    .bind(record_id)
    .bind(sent_at)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (\
             SELECT 1 FROM recipient_records WHERE campaign_id = $1 AND record_id = $2\
         )",
    )
    .bind(campaign_id)
    .bind(record_id)
    .fetch_one(pool)
    .await?;

    if exists {
        Ok(false)
    } else {
        Err(DbError::NotFound {
            entity: "recipient record",
            key: record_id.to_string(),
        })
    }
}

/// Delete every record of a campaign, returning how many were removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn delete_campaign_records(pool: &PgPool, campaign_id: &str) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM recipient_records WHERE campaign_id = $1")
        .bind(campaign_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
