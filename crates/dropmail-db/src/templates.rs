use chrono::{DateTime, Utc};
use dropmail_core::{ChatMessage, TemplateConfig, TemplateInstance, VersionEntry};
use sqlx::{types::Json, PgPool};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TemplateRow {
    pub campaign_id: String,
    pub template_html_raw: String,
    pub template_config: Json<TemplateConfig>,
    pub version_history: Json<Vec<VersionEntry>>,
    pub chat_history: Json<Vec<ChatMessage>>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl From<TemplateRow> for TemplateInstance {
    fn from(row: TemplateRow) -> Self {
        TemplateInstance {
            campaign_id: row.campaign_id,
            template_html_raw: row.template_html_raw,
            template_config: row.template_config.0,
            version_history: row.version_history.0,
            chat_history: row.chat_history.0,
            created_at: row.created_at,
            last_modified: row.last_modified,
        }
    }
}

/// Fetch the template instance of a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or when a JSON column does
/// not decode.
pub async fn get_template(
    pool: &PgPool,
    campaign_id: &str,
) -> Result<Option<TemplateInstance>, DbError> {
    let row = sqlx::query_as::<_, TemplateRow>(
        "SELECT campaign_id, template_html_raw, template_config, version_history, \
                chat_history, created_at, last_modified \
         FROM template_instances \
         WHERE campaign_id = $1",
    )
    .bind(campaign_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(TemplateInstance::from))
}

/// Insert or replace the template instance of a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, including when the campaign
/// does not exist.
pub async fn upsert_template(pool: &PgPool, template: &TemplateInstance) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO template_instances \
             (campaign_id, template_html_raw, template_config, version_history, \
              chat_history, created_at, last_modified) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (campaign_id) DO UPDATE \
         SET template_html_raw = EXCLUDED.template_html_raw, \
             template_config = EXCLUDED.template_config, \
             version_history = EXCLUDED.version_history, \
             chat_history = EXCLUDED.chat_history, \
             last_modified = EXCLUDED.last_modified",
    )
    .bind(&template.campaign_id)
    .bind(&template.template_html_raw)
    .bind(Json(&template.template_config))
    .bind(Json(&template.version_history))
    .bind(Json(&template.chat_history))
    .bind(template.created_at)
    .bind(template.last_modified)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete the template instance of a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn delete_template(pool: &PgPool, campaign_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM template_instances WHERE campaign_id = $1")
        .bind(campaign_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
