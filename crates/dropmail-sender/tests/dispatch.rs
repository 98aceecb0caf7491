//! Catalog upload through dispatch against the in-memory stores.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dropmail_catalog::{process_campaign, ProcessOptions};
use dropmail_core::memory::{MemoryBlobStore, MemoryStore};
use dropmail_core::{
    catalog_key, BatchStatus, BatchStore, BlobStore, Campaign, CampaignStatus, CampaignStore,
    DirectoryStore, InstitutionInfo, Recipient, RecordStore,
};
use dropmail_sender::{send_batch, DispatchConfig, EmailProvider, OutgoingEmail, SendError};
use dropmail_template::default_config;

const CATALOG: &str = "\
Handle,Title,Option1 Name,Option1 Value,Variant SKU,Variant Price,Image Src
tee-001,Tee,Size,12 inch,ABC-C-RAD1,19.99,https://img.example.com/tee.png
tee-001,,Size,16 inch,ABC-C-RAD2,24.99,https://img.example.com/tee.png
";

/// Records every message and rejects addresses on the bounce list.
#[derive(Default)]
struct RecordingProvider {
    bounces: Vec<String>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl EmailProvider for RecordingProvider {
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, SendError> {
        if self.bounces.contains(&email.to) {
            return Err(SendError::Rejected("address bounced".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(email.clone());
        Ok(Some(format!("msg-{}", email.to)))
    }
}

fn dispatch_config() -> DispatchConfig {
    DispatchConfig {
        sender_email: "info@rrinconline.com".to_string(),
        reply_to: "info@rrinconline.com".to_string(),
        emails_per_second: 14,
        batch_timeout: Duration::from_secs(600),
        test_fallback_codes: Vec::new(),
    }
}

async fn processed(recipients: usize, batch_size: usize) -> MemoryStore {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    store
        .upsert_institution(&InstitutionInfo {
            code: "RAD".to_string(),
            name: "Radford Highlanders".to_string(),
            page_url: "https://www.rrinconline.com/collections/radford-highlanders".to_string(),
            logo_url: String::new(),
        })
        .await
        .unwrap();
    for i in 0..recipients {
        store
            .upsert_recipient(&Recipient {
                email: format!("fan{i:02}@example.com"),
                display_name: format!("Fan {i}"),
                institution_code: "RAD".to_string(),
                source: None,
            })
            .await
            .unwrap();
    }

    let key = catalog_key("c1", "catalog.csv");
    blobs
        .put_object(&key, CATALOG.as_bytes().to_vec(), "text/csv")
        .await
        .unwrap();
    let mut campaign = Campaign::new("c1", "Fall Drop", "", default_config());
    campaign.file_s3_key = Some(key);
    store.create_campaign(&campaign).await.unwrap();

    let options = ProcessOptions {
        batch_size,
        ..ProcessOptions::default()
    };
    process_campaign(&store, &blobs, "c1", &options).await.unwrap();
    store
}

#[tokio::test]
async fn every_batch_dispatched_completes_the_campaign() {
    let store = processed(5, 2).await;
    let provider = RecordingProvider {
        bounces: vec!["fan03@example.com".to_string()],
        ..RecordingProvider::default()
    };

    let batches = store.list_batches("c1").await.unwrap();
    assert_eq!(batches.len(), 3);
    for batch in &batches {
        send_batch(&store, &provider, &dispatch_config(), "c1", batch.batch_number, false)
            .await
            .unwrap();
    }

    let sent = provider.sent.lock().unwrap();
    assert_eq!(sent.len(), 4);
    assert!(sent
        .iter()
        .all(|e| e.subject.ends_with("Radford Highlanders Collection Just Dropped!")));
    assert!(sent.iter().all(|e| e.html_body.contains("$19.99")));
    assert!(sent.iter().all(|e| !e.html_body.contains("$24.99")));

    let statuses: Vec<BatchStatus> = store
        .list_batches("c1")
        .await
        .unwrap()
        .iter()
        .map(|b| b.status)
        .collect();
    assert!(statuses.iter().all(|s| *s == BatchStatus::Completed));

    let campaign = store.get_campaign("c1").await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.emails_sent, 4);

    let bounced = store
        .find_record_by_email("c1", "FAN03@example.com")
        .await
        .unwrap()
        .expect("record exists");
    assert!(!bounced.email_sent);
}

#[tokio::test]
async fn partially_dispatched_campaign_returns_to_ready() {
    let store = processed(3, 2).await;
    let provider = RecordingProvider::default();

    send_batch(&store, &provider, &dispatch_config(), "c1", 1, false)
        .await
        .unwrap();

    let campaign = store.get_campaign("c1").await.unwrap().unwrap();
    assert_eq!(campaign.status, CampaignStatus::Ready);
    assert_eq!(campaign.emails_sent, 2);
    let second = store.get_batch("c1", 2).await.unwrap().unwrap();
    assert_eq!(second.status, BatchStatus::Ready);
}
