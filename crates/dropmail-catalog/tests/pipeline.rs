use dropmail_catalog::{process_campaign, CatalogError, ProcessOptions};
use dropmail_core::memory::{MemoryBlobStore, MemoryStore};
use dropmail_core::{
    catalog_key, BatchStore, BlobStore, Campaign, CampaignStatus, CampaignStore, DirectoryStore,
    InstitutionInfo, Recipient, RecordStore, TemplateConfig,
};
use dropmail_template::{base_subject, personalized_subject};

const CATALOG: &str = "\
Handle,Title,Option1 Name,Option1 Value,Variant SKU,Variant Price,Image Src
tee-001,Tee,Size,12 inch,ABC-C-RAD1,19.99,https://img.example.com/tee.png
tee-001,,Size,16 inch,ABC-C-RAD2,24.99,https://img.example.com/tee.png
mug-002,Mug,Title,Default,MUG-C-ZZZ1,9.99,https://img.example.com/mug.png
hat-003,Hat,Title,Default,HAT-C-RAD,15.00,
";

async fn setup(recipients: usize) -> (MemoryStore, MemoryBlobStore) {
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
                email: format!("fan{i:03}@example.com"),
                display_name: if i == 0 { "Sam".to_string() } else { String::new() },
                institution_code: "RAD".to_string(),
                source: Some("import".to_string()),
            })
            .await
            .unwrap();
    }

    let mut campaign = Campaign::new("c1", "Fall Drop", "", TemplateConfig::new());
    let key = catalog_key("c1", "catalog.csv");
    blobs
        .put_object(&key, CATALOG.as_bytes().to_vec(), "text/csv")
        .await
        .unwrap();
    campaign.file_s3_key = Some(key);
    store.create_campaign(&campaign).await.unwrap();

    (store, blobs)
}

#[tokio::test]
async fn sized_tee_becomes_one_record_for_radford() {
    let (store, blobs) = setup(1).await;

    let summary = process_campaign(&store, &blobs, "c1", &ProcessOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.total_batches, 1);
    assert_eq!(summary.schools_processed, 1);
    assert_eq!(summary.schools_skipped, 0);
    assert_eq!(summary.products_found, 1);

    let records = store.list_campaign_records("c1").await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.institution_code, "RAD");
    assert_eq!(record.product_price(1), "19.99");
    assert_eq!(record.product_price(2), "");
    assert_eq!(record.products[0].name, "Tee 12 inch");
    assert_eq!(
        record.products[0].link,
        "https://www.rrinconline.com/products/tee-001"
    );

    let campaign = store.get_campaign("c1").await.unwrap().unwrap();
    let subject = personalized_subject(base_subject(&campaign.template_config), record);
    assert!(subject.contains("Radford Highlanders"));
    assert_eq!(campaign.status, CampaignStatus::Ready);
    assert_eq!(campaign.total_emails, 1);
    assert_eq!(campaign.batch_count, 1);
    assert!(campaign.file_processed_at.is_some());
}

#[tokio::test]
async fn batch_count_is_ceiling_of_records_over_batch_size() {
    let (store, blobs) = setup(11).await;
    let options = ProcessOptions {
        batch_size: 4,
        ..ProcessOptions::default()
    };

    let summary = process_campaign(&store, &blobs, "c1", &options).await.unwrap();
    assert_eq!(summary.total_records, 11);
    assert_eq!(summary.total_batches, 3);

    let sizes: Vec<u32> = store
        .list_batches("c1")
        .await
        .unwrap()
        .iter()
        .map(|b| b.total_emails)
        .collect();
    assert_eq!(sizes, vec![4, 4, 3]);
}

#[tokio::test]
async fn failed_recipient_lookup_is_reported_as_skipped() {
    let (store, blobs) = setup(3).await;
    store.fail_recipient_lookup("RAD").await;

    let summary = process_campaign(&store, &blobs, "c1", &ProcessOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.schools_processed, 1);
    assert_eq!(summary.schools_skipped, 1);
    assert_eq!(summary.total_records, 0);
    assert!(store.list_campaign_records("c1").await.unwrap().is_empty());
}

#[tokio::test]
async fn reprocessing_replaces_previous_records() {
    let (store, blobs) = setup(5).await;
    let options = ProcessOptions {
        batch_size: 2,
        ..ProcessOptions::default()
    };
    process_campaign(&store, &blobs, "c1", &options).await.unwrap();

    let options = ProcessOptions {
        batch_size: 10,
        ..ProcessOptions::default()
    };
    let summary = process_campaign(&store, &blobs, "c1", &options).await.unwrap();
    assert_eq!(summary.total_batches, 1);
    assert_eq!(store.list_batches("c1").await.unwrap().len(), 1);
    assert_eq!(store.list_campaign_records("c1").await.unwrap().len(), 5);
}

#[tokio::test]
async fn campaign_without_upload_is_rejected() {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    store
        .create_campaign(&Campaign::new("c2", "Empty", "", TemplateConfig::new()))
        .await
        .unwrap();

    let err = process_campaign(&store, &blobs, "c2", &ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NoCatalog(ref id) if id == "c2"));

    let err = process_campaign(&store, &blobs, "missing", &ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CampaignNotFound(_)));
}

#[tokio::test]
async fn sending_campaign_is_not_reprocessed() {
    let (store, blobs) = setup(1).await;
    let mut campaign = store.get_campaign("c1").await.unwrap().unwrap();
    campaign.status = CampaignStatus::Sending;
    store.update_campaign(&campaign).await.unwrap();

    let err = process_campaign(&store, &blobs, "c1", &ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CampaignBusy(_)));
}
