use chrono::{DateTime, Utc};
use dropmail_core::{Campaign, CampaignStatus, TemplateConfig};
use sqlx::{types::Json, PgPool};

use crate::{from_db_int, to_db_int, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub campaign_id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub template_config: Json<TemplateConfig>,
    pub file_s3_key: Option<String>,
    pub file_name: Option<String>,
    pub batch_count: i32,
    pub total_emails: i32,
    pub emails_sent: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = DbError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| DbError::InvalidColumn {
            column: "campaigns.status",
            reason: row.status.clone(),
        })?;
        Ok(Campaign {
            campaign_id: row.campaign_id,
            name: row.name,
            description: row.description,
            status,
            template_config: row.template_config.0,
            file_s3_key: row.file_s3_key,
            file_name: row.file_name,
            batch_count: from_db_int(row.batch_count, "campaigns.batch_count")?,
            total_emails: from_db_int(row.total_emails, "campaigns.total_emails")?,
            emails_sent: from_db_int(row.emails_sent, "campaigns.emails_sent")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            file_processed_at: row.file_processed_at,
        })
    }
}

const CAMPAIGN_COLUMNS: &str = "campaign_id, name, description, status, template_config, \
     file_s3_key, file_name, batch_count, total_emails, emails_sent, \
     created_at, updated_at, file_processed_at";

// ---------------------------------------------------------------------------
// Campaign functions
// ---------------------------------------------------------------------------

/// Insert a new campaign.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the id is already taken, or
/// [`DbError::Sqlx`] on any other database error.
pub async fn insert_campaign(pool: &PgPool, campaign: &Campaign) -> Result<(), DbError> {
    let result = sqlx::query(
        "INSERT INTO campaigns \
             (campaign_id, name, description, status, template_config, file_s3_key, file_name, \
              batch_count, total_emails, emails_sent, created_at, updated_at, file_processed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (campaign_id) DO NOTHING",
    )
    .bind(&campaign.campaign_id)
    .bind(&campaign.name)
    .bind(&campaign.description)
    .bind(campaign.status.as_str())
    .bind(Json(&campaign.template_config))
    .bind(campaign.file_s3_key.as_deref())
    .bind(campaign.file_name.as_deref())
    .bind(to_db_int(campaign.batch_count, "campaigns.batch_count")?)
    .bind(to_db_int(campaign.total_emails, "campaigns.total_emails")?)
    .bind(to_db_int(campaign.emails_sent, "campaigns.emails_sent")?)
    .bind(campaign.created_at)
    .bind(campaign.updated_at)
    .bind(campaign.file_processed_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Conflict(format!(
            "campaign {} already exists",
            campaign.campaign_id
        )));
    }
    Ok(())
}

/// Fetch a campaign by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::InvalidColumn`]
/// if a stored value cannot be decoded.
pub async fn get_campaign(pool: &PgPool, campaign_id: &str) -> Result<Option<Campaign>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_id = $1"
    ))
    .bind(campaign_id)
    .fetch_optional(pool)
    .await?;

    row.map(Campaign::try_from).transpose()
}

/// List all campaigns, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_campaigns(pool: &PgPool) -> Result<Vec<Campaign>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC, campaign_id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Campaign::try_from).collect()
}

/// Overwrite the mutable columns of an existing campaign and bump `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no campaign has this id.
pub async fn update_campaign(pool: &PgPool, campaign: &Campaign) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns \
         SET name = $2, \
             description = $3, \
             status = $4, \
             template_config = $5, \
             file_s3_key = $6, \
             file_name = $7, \
             batch_count = $8, \
             total_emails = $9, \
             emails_sent = $10, \
             file_processed_at = $11, \
             updated_at = NOW() \
         WHERE campaign_id = $1",
    )
    .bind(&campaign.campaign_id)
    .bind(&campaign.name)
    .bind(&campaign.description)
    .bind(campaign.status.as_str())
    .bind(Json(&campaign.template_config))
    .bind(campaign.file_s3_key.as_deref())
    .bind(campaign.file_name.as_deref())
    .bind(to_db_int(campaign.batch_count, "campaigns.batch_count")?)
    .bind(to_db_int(campaign.total_emails, "campaigns.total_emails")?)
    .bind(to_db_int(campaign.emails_sent, "campaigns.emails_sent")?)
    .bind(campaign.file_processed_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "campaign",
            key: campaign.campaign_id.clone(),
        });
    }
    Ok(())
}

/// Change only the status column.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no campaign has this id.
pub async fn set_campaign_status(
    pool: &PgPool,
    campaign_id: &str,
    status: CampaignStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns SET status = $2, updated_at = NOW() WHERE campaign_id = $1",
    )
    .bind(campaign_id)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "campaign",
            key: campaign_id.to_string(),
        });
    }
    Ok(())
}

/// Add `count` to the campaign's running sent total in a single statement.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no campaign has this id.
pub async fn add_emails_sent(pool: &PgPool, campaign_id: &str, count: u32) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns \
         SET emails_sent = emails_sent + $2, updated_at = NOW() \
         WHERE campaign_id = $1",
    )
    .bind(campaign_id)
    .bind(to_db_int(count, "campaigns.emails_sent")?)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "campaign",
            key: campaign_id.to_string(),
        });
    }
    Ok(())
}

/// Delete a campaign; records, batches and its template cascade.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn delete_campaign(pool: &PgPool, campaign_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM campaigns WHERE campaign_id = $1")
        .bind(campaign_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
