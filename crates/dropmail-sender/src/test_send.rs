//! Preview sends to the active test accounts.

use dropmail_core::{RecipientRecord, Store, TestAccount};
use dropmail_template::{base_subject, personalized_subject, render_personalized};
use serde::Serialize;

use crate::dispatch::{load_rendering, DispatchConfig};
use crate::error::DispatchError;
use crate::provider::EmailProvider;

pub const TEST_SUBJECT_PREFIX: &str = "[TEST]";

/// What happened for one test account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSendResult {
    pub email: String,
    /// Institution code of the record the preview was built from.
    pub institution_code: Option<String>,
    pub sent: bool,
    pub error: Option<String>,
}

/// Sends one preview to every active test account.
///
/// Each account gets the campaign's email as rendered for a representative
/// recipient record: the first record with the account's own institution
/// code, else the first record for each fallback code in turn. Records and
/// batches are never modified.
///
/// # Errors
///
/// Returns [`DispatchError::CampaignNotFound`] for an unknown campaign or
/// [`DispatchError::Store`] if a lookup fails.
pub async fn send_test<S: Store + ?Sized>(
    store: &S,
    provider: &dyn EmailProvider,
    config: &DispatchConfig,
    campaign_id: &str,
) -> Result<Vec<TestSendResult>, DispatchError> {
    let rendering = load_rendering(store, campaign_id).await?;
    let accounts: Vec<TestAccount> = store
        .list_test_accounts()
        .await?
        .into_iter()
        .filter(|a| a.active)
        .collect();

    if accounts.is_empty() {
        tracing::warn!(campaign_id, "no active test accounts");
        return Ok(Vec::new());
    }

    let subject_base = base_subject(&rendering.config);
    let mut results = Vec::with_capacity(accounts.len());

    for account in &accounts {
        let Some(sample) =
            representative_record(store, campaign_id, account, &config.test_fallback_codes).await?
        else {
            tracing::warn!(campaign_id, email = %account.email, "no record to preview");
            results.push(TestSendResult {
                email: account.email.clone(),
                institution_code: None,
                sent: false,
                error: Some("no recipient record for the account's code or fallback codes".to_string()),
            });
            continue;
        };

        let preview = addressed_to(sample, account);
        let subject = format!(
            "{TEST_SUBJECT_PREFIX} {}",
            personalized_subject(subject_base, &preview)
        );
        let email = config.outgoing(
            &account.email,
            subject,
            render_personalized(&rendering.html, &rendering.config, &preview),
        );

        let (sent, error) = match provider.send(&email).await {
            Ok(_) => (true, None),
            Err(e) => {
                tracing::warn!(campaign_id, email = %account.email, error = %e, "test send failed");
                (false, Some(e.to_string()))
            }
        };
        results.push(TestSendResult {
            email: account.email.clone(),
            institution_code: Some(preview.institution_code),
            sent,
            error,
        });
    }

    tracing::info!(
        campaign_id,
        accounts = results.len(),
        sent = results.iter().filter(|r| r.sent).count(),
        "test send finished"
    );
    Ok(results)
}

async fn representative_record<S: Store + ?Sized>(
    store: &S,
    campaign_id: &str,
    account: &TestAccount,
    fallback_codes: &[String],
) -> Result<Option<RecipientRecord>, DispatchError> {
    let own = std::iter::once(account.school_code.as_str());
    let fallbacks = fallback_codes
        .iter()
        .map(String::as_str)
        .filter(|code| *code != account.school_code);

    for code in own.chain(fallbacks) {
        if let Some(record) = store.find_record_by_code(campaign_id, code).await? {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// The sample record re-addressed to the test account.
fn addressed_to(mut record: RecipientRecord, account: &TestAccount) -> RecipientRecord {
    record.recipient_email.clone_from(&account.email);
    record.recipient_name.clone_from(&account.name);
    record
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::provider::MockEmailProvider;
    use chrono::Utc;
    use dropmail_core::memory::MemoryStore;
    use dropmail_core::{
        Batch, BatchStatus, BatchStore, Campaign, CampaignStore, RecordStore, TestAccountStore,
    };
    use dropmail_template::default_config;

    fn config() -> DispatchConfig {
        DispatchConfig {
            sender_email: "info@rrinconline.com".to_string(),
            reply_to: "info@rrinconline.com".to_string(),
            emails_per_second: 14,
            batch_timeout: Duration::from_secs(600),
            test_fallback_codes: vec!["AKN".to_string(), "RAD".to_string()],
        }
    }

    fn record(sequence: u64, code: &str, institution: &str) -> RecipientRecord {
        RecipientRecord {
            campaign_id: "c1".to_string(),
            record_id: RecipientRecord::record_id_for("c1", sequence),
            sequence,
            batch_number: 1,
            recipient_email: format!("real{sequence}@example.com"),
            recipient_name: "Real Customer".to_string(),
            institution_code: code.to_string(),
            institution_name: institution.to_string(),
            products: Vec::new(),
            institution_page_url: String::new(),
            institution_logo_url: String::new(),
            email_sent: false,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_campaign(&Campaign::new("c1", "Fall", "", default_config()))
            .await
            .unwrap();
        store
            .put_records(&[
                record(0, "RAD", "Radford Highlanders"),
                record(1, "JMU", "James Madison Dukes"),
            ])
            .await
            .unwrap();
        store.insert_batch(&Batch::ready("c1", 1, 2)).await.unwrap();
        store
    }

    fn account(email: &str, code: &str, active: bool) -> TestAccount {
        TestAccount {
            email: email.to_string(),
            name: "Quinn".to_string(),
            school_code: code.to_string(),
            active,
        }
    }

    #[tokio::test]
    async fn own_code_then_fallbacks_and_no_mutation() {
        let store = seeded().await;
        store
            .upsert_test_account(&account("own@example.com", "JMU", true))
            .await
            .unwrap();
        store
            .upsert_test_account(&account("fallback@example.com", "TEST", true))
            .await
            .unwrap();
        store
            .upsert_test_account(&account("inactive@example.com", "RAD", false))
            .await
            .unwrap();

        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|email| {
                email.to == "own@example.com"
                    && email.subject == "[TEST] Hi Quinn, James Madison Dukes Collection Just Dropped!"
            })
            .times(1)
            .returning(|_| Ok(None));
        provider
            .expect_send()
            .withf(|email| {
                email.to == "fallback@example.com"
                    && email.subject.starts_with("[TEST] Hi Quinn, Radford Highlanders")
            })
            .times(1)
            .returning(|_| Ok(None));

        let results = send_test(&store, &provider, &config(), "c1").await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.sent));
        assert!(store
            .list_campaign_records("c1")
            .await
            .unwrap()
            .iter()
            .all(|r| !r.email_sent));
        let batch = store.get_batch("c1", 1).await.unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Ready);
        assert_eq!(store.get_campaign("c1").await.unwrap().unwrap().emails_sent, 0);
    }

    #[tokio::test]
    async fn account_without_any_record_is_reported() {
        let store = seeded().await;
        store
            .upsert_test_account(&account("qa@example.com", "ZZZ", true))
            .await
            .unwrap();
        let mut cfg = config();
        cfg.test_fallback_codes = vec!["NOPE".to_string()];
        let mut provider = MockEmailProvider::new();
        provider.expect_send().never();

        let results = send_test(&store, &provider, &cfg, "c1").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].sent);
        assert!(results[0].error.is_some());
    }

    #[tokio::test]
    async fn send_batch_in_test_mode_skips_batch_tracking() {
        let store = seeded().await;
        store
            .upsert_test_account(&account("qa@example.com", "RAD", true))
            .await
            .unwrap();
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(1).returning(|_| Ok(None));

        let outcome = crate::send_batch(&store, &provider, &config(), "c1", 1, true)
            .await
            .unwrap();

        assert_eq!(outcome.emails_sent, 1);
        assert_eq!(outcome.total_recipients, 1);
        let batch = store.get_batch("c1", 1).await.unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Ready);
        assert!(batch.started_at.is_none());
    }
}
