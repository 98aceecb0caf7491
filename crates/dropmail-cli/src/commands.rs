//! Command handlers, called from `main` once config and the pool are ready.

use std::path::Path;

use dropmail_catalog::ProcessOptions;
use dropmail_core::s3::S3BlobStore;
use dropmail_core::{AppConfig, DirectorySeed, DirectoryStore, TestAccountStore};
use dropmail_db::PgStore;
use dropmail_sender::{DispatchConfig, SmtpProvider};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SeedCounts {
    pub institutions: usize,
    pub recipients: usize,
    pub test_accounts: usize,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn run_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = dropmail_db::run_migrations(pool).await?;
    println!("migrations applied: {applied}");
    Ok(())
}

/// Writes every entry of a validated seed. Existing rows with the same key
/// are overwritten.
pub(crate) async fn seed_directory<S>(store: &S, seed: &DirectorySeed) -> anyhow::Result<SeedCounts>
where
    S: DirectoryStore + TestAccountStore + ?Sized,
{
    for institution in &seed.institutions {
        store.upsert_institution(institution).await?;
    }
    for recipient in &seed.recipients {
        store.upsert_recipient(recipient).await?;
    }
    for account in &seed.test_accounts {
        store.upsert_test_account(account).await?;
    }
    Ok(SeedCounts {
        institutions: seed.institutions.len(),
        recipients: seed.recipients.len(),
        test_accounts: seed.test_accounts.len(),
    })
}

pub(crate) async fn run_seed(pool: &PgPool, path: &Path) -> anyhow::Result<()> {
    let seed = dropmail_core::load_directory_seed(path)?;
    let store = PgStore::new(pool.clone());
    let counts = seed_directory(&store, &seed).await?;
    tracing::info!(
        path = %path.display(),
        institutions = counts.institutions,
        recipients = counts.recipients,
        test_accounts = counts.test_accounts,
        "directory seeded"
    );
    println!(
        "seeded {} institutions, {} recipients, {} test accounts",
        counts.institutions, counts.recipients, counts.test_accounts
    );
    Ok(())
}

pub(crate) async fn run_process(
    pool: &PgPool,
    config: &AppConfig,
    campaign_id: &str,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(config.emails_per_batch);
    if batch_size == 0 {
        anyhow::bail!("--batch-size must be greater than zero");
    }
    let options = ProcessOptions {
        batch_size,
        product_base_url: config.product_base_url.clone(),
    };
    let store = PgStore::new(pool.clone());
    let blobs = S3BlobStore::new(&config.s3_bucket, &config.s3_region).await;

    let summary =
        dropmail_catalog::process_campaign(&store, &blobs, campaign_id, &options).await?;
    print_json(&summary)
}

pub(crate) async fn run_send_batch(
    pool: &PgPool,
    config: &AppConfig,
    campaign_id: &str,
    batch_number: u32,
    is_test: bool,
) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone());
    let provider = SmtpProvider::from_config(config)?;
    let dispatch = DispatchConfig::from_app_config(config);

    let outcome = dropmail_sender::send_batch(
        &store,
        &provider,
        &dispatch,
        campaign_id,
        batch_number,
        is_test,
    )
    .await?;
    if outcome.timed_out {
        tracing::warn!(
            campaign_id,
            batch_number,
            "batch stopped at the timeout; run send-batch again to resume"
        );
    }
    print_json(&outcome)
}

pub(crate) async fn run_send_test(
    pool: &PgPool,
    config: &AppConfig,
    campaign_id: &str,
) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone());
    let provider = SmtpProvider::from_config(config)?;
    let dispatch = DispatchConfig::from_app_config(config);

    let results = dropmail_sender::send_test(&store, &provider, &dispatch, campaign_id).await?;
    if results.is_empty() {
        println!("no active test accounts");
        return Ok(());
    }
    print_json(&results)
}

pub(crate) async fn run_reconcile(pool: &PgPool, campaign_id: &str) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone());
    let report = dropmail_catalog::reconcile_batches(&store, campaign_id).await?;
    print_json(&report)
}
