use dropmail_core::TestAccount;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TestAccountRow {
    pub email: String,
    pub name: String,
    pub school_code: String,
    pub active: bool,
}

impl From<TestAccountRow> for TestAccount {
    fn from(row: TestAccountRow) -> Self {
        TestAccount {
            email: row.email,
            name: row.name,
            school_code: row.school_code,
            active: row.active,
        }
    }
}

/// Every test account, active or not, ordered by email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_test_accounts(pool: &PgPool) -> Result<Vec<TestAccount>, DbError> {
    let rows = sqlx::query_as::<_, TestAccountRow>(
        "SELECT email, name, school_code, active FROM test_accounts ORDER BY email",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(TestAccount::from).collect())
}

/// Insert or update a test account keyed by email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn upsert_test_account(pool: &PgPool, account: &TestAccount) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO test_accounts (email, name, school_code, active) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (email) DO UPDATE \
         SET name = EXCLUDED.name, \
             school_code = EXCLUDED.school_code, \
             active = EXCLUDED.active",
    )
    .bind(&account.email)
    .bind(&account.name)
    .bind(&account.school_code)
    .bind(account.active)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a test account.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn delete_test_account(pool: &PgPool, email: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM test_accounts WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
