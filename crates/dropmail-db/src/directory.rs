use std::collections::{BTreeMap, HashMap};

use dropmail_core::{InstitutionInfo, Recipient, RecipientPage};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstitutionRow {
    pub name: String,
    pub code: String,
    pub page_url: String,
    pub logo_url: String,
}

impl From<InstitutionRow> for InstitutionInfo {
    fn from(row: InstitutionRow) -> Self {
        InstitutionInfo {
            code: row.code,
            name: row.name,
            page_url: row.page_url,
            logo_url: row.logo_url,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipientRow {
    pub email: String,
    pub display_name: String,
    pub institution_code: String,
    pub source: Option<String>,
}

impl From<RecipientRow> for Recipient {
    fn from(row: RecipientRow) -> Self {
        Recipient {
            email: row.email,
            display_name: row.display_name,
            institution_code: row.institution_code,
            source: row.source,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SourceCountRow {
    source: String,
    total: i64,
}

// ---------------------------------------------------------------------------
// Institution directory
// ---------------------------------------------------------------------------

/// Every directory entry, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_institutions(pool: &PgPool) -> Result<Vec<InstitutionInfo>, DbError> {
    let rows = sqlx::query_as::<_, InstitutionRow>(
        "SELECT name, code, page_url, logo_url \
         FROM institution_directory \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(InstitutionInfo::from).collect())
}

/// Scan the name-keyed directory and index it by code.
///
/// When several names share a code the last one by name wins.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn institution_directory(
    pool: &PgPool,
) -> Result<HashMap<String, InstitutionInfo>, DbError> {
    Ok(list_institutions(pool)
        .await?
        .into_iter()
        .map(|info| (info.code.clone(), info))
        .collect())
}

/// Insert or update a directory entry keyed by its name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn upsert_institution(pool: &PgPool, info: &InstitutionInfo) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO institution_directory (name, code, page_url, logo_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (name) DO UPDATE \
         SET code = EXCLUDED.code, \
             page_url = EXCLUDED.page_url, \
             logo_url = EXCLUDED.logo_url, \
             updated_at = NOW()",
    )
    .bind(&info.name)
    .bind(&info.code)
    .bind(&info.page_url)
    .bind(&info.logo_url)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

/// Recipients tagged with `institution_code`, ordered by email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn recipients_for_code(
    pool: &PgPool,
    institution_code: &str,
) -> Result<Vec<Recipient>, DbError> {
    let rows = sqlx::query_as::<_, RecipientRow>(
        "SELECT email, display_name, institution_code, source \
         FROM recipients \
         WHERE institution_code = $1 \
         ORDER BY email",
    )
    .bind(institution_code)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Recipient::from).collect())
}

/// Insert or update a recipient keyed by email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn upsert_recipient(pool: &PgPool, recipient: &Recipient) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO recipients (email, display_name, institution_code, source) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (email) DO UPDATE \
         SET display_name = EXCLUDED.display_name, \
             institution_code = EXCLUDED.institution_code, \
             source = EXCLUDED.source",
    )
    .bind(&recipient.email)
    .bind(&recipient.display_name)
    .bind(&recipient.institution_code)
    .bind(recipient.source.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

/// One page of recipients ordered by email, plus per-source totals for the
/// whole table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_recipients(
    pool: &PgPool,
    after_email: Option<&str>,
    limit: usize,
) -> Result<RecipientPage, DbError> {
    let rows = sqlx::query_as::<_, RecipientRow>(
        "SELECT email, display_name, institution_code, source \
         FROM recipients \
         WHERE ($1::TEXT IS NULL OR email > $1) \
         ORDER BY email \
         LIMIT $2",
    )
    .bind(after_email)
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    let counts = sqlx::query_as::<_, SourceCountRow>(
        "SELECT COALESCE(source, 'unknown') AS source, COUNT(*) AS total \
         FROM recipients \
         GROUP BY 1",
    )
    .fetch_all(pool)
    .await?;

    let recipients: Vec<Recipient> = rows.into_iter().map(Recipient::from).collect();
    let next_key = if limit > 0 && recipients.len() == limit {
        recipients.last().map(|r| r.email.clone())
    } else {
        None
    };
    let source_counts: BTreeMap<String, u64> = counts
        .into_iter()
        .map(|c| (c.source, u64::try_from(c.total).unwrap_or(0)))
        .collect();

    Ok(RecipientPage {
        recipients,
        next_key,
        source_counts,
    })
}
