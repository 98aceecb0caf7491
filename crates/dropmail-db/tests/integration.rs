//! Offline tests for dropmail-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use dropmail_core::{
    AppConfig, Batch, BatchStatus, Campaign, CampaignStatus, Environment, ProductSlot,
    RecipientRecord, TemplateConfig,
};
use dropmail_db::{BatchRow, CampaignRow, DbError, PoolConfig, RecordRow};
use sqlx::types::Json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        s3_bucket: "bucket".to_string(),
        s3_region: "us-east-1".to_string(),
        smtp_host: "localhost".to_string(),
        smtp_port: 1025,
        smtp_username: None,
        smtp_password: None,
        sender_email: "drops@example.com".to_string(),
        reply_to: "support@example.com".to_string(),
        llm_api_key: None,
        llm_base_url: "https://llm.example.com/v1".to_string(),
        llm_model: "model".to_string(),
        llm_timeout_secs: 30,
        emails_per_batch: 2000,
        emails_per_second: 14,
        batch_timeout_secs: 840,
        product_base_url: "https://shop.example.com/products/".to_string(),
        test_fallback_codes: vec!["RAD".to_string()],
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn campaign_row_converts_to_campaign() {
    let mut config = TemplateConfig::new();
    config.set(dropmail_core::Placeholder::MainTitle, "Fall Drop");
    let row = CampaignRow {
        campaign_id: "c1".to_string(),
        name: "Fall".to_string(),
        description: String::new(),
        status: "ready".to_string(),
        template_config: Json(config.clone()),
        file_s3_key: Some("campaigns/c1/catalog.csv".to_string()),
        file_name: Some("catalog.csv".to_string()),
        batch_count: 3,
        total_emails: 5000,
        emails_sent: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        file_processed_at: None,
    };

    let campaign = Campaign::try_from(row).expect("row converts");
    assert_eq!(campaign.status, CampaignStatus::Ready);
    assert_eq!(campaign.batch_count, 3);
    assert_eq!(campaign.template_config, config);
}

#[test]
fn campaign_row_with_unknown_status_is_rejected() {
    let row = CampaignRow {
        campaign_id: "c1".to_string(),
        name: "Fall".to_string(),
        description: String::new(),
        status: "archived".to_string(),
        template_config: Json(TemplateConfig::new()),
        file_s3_key: None,
        file_name: None,
        batch_count: 0,
        total_emails: 0,
        emails_sent: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        file_processed_at: None,
    };

    let err = Campaign::try_from(row).expect_err("unknown status must fail");
    assert!(matches!(err, DbError::InvalidColumn { column: "campaigns.status", .. }));
}

#[test]
fn record_row_keeps_products_in_order() {
    let slots = vec![
        ProductSlot {
            link: "https://shop.example.com/products/a".to_string(),
            image: "https://img.example.com/a.png".to_string(),
            price: "19.99".to_string(),
            name: "A".to_string(),
        },
        ProductSlot {
            link: "https://shop.example.com/products/b".to_string(),
            image: "https://img.example.com/b.png".to_string(),
            price: "20".to_string(),
            name: "B".to_string(),
        },
    ];
    let row = RecordRow {
        campaign_id: "c1".to_string(),
        record_id: "c1_12".to_string(),
        sequence: 12,
        batch_number: 1,
        recipient_email: "sam@example.com".to_string(),
        recipient_name: "Sam".to_string(),
        institution_code: "RAD".to_string(),
        institution_name: "Radford Highlanders".to_string(),
        products: Json(slots.clone()),
        institution_page_url: String::new(),
        institution_logo_url: String::new(),
        email_sent: false,
        sent_at: None,
        created_at: Utc::now(),
    };

    let record = RecipientRecord::try_from(row).expect("row converts");
    assert_eq!(record.sequence, 12);
    assert_eq!(record.products, slots);
    assert_eq!(record.product_price(2), "20");
}

#[test]
fn batch_row_with_negative_counter_is_rejected() {
    let row = BatchRow {
        campaign_id: "c1".to_string(),
        batch_number: 1,
        status: "sending".to_string(),
        total_emails: 10,
        emails_sent: -1,
        failed_emails: 0,
        progress_percent: 0,
        error_message: None,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        lease_expires_at: None,
    };

    assert!(Batch::try_from(row).is_err());
}

#[test]
fn batch_row_converts_status() {
    let row = BatchRow {
        campaign_id: "c1".to_string(),
        batch_number: 2,
        status: "completed".to_string(),
        total_emails: 10,
        emails_sent: 7,
        failed_emails: 3,
        progress_percent: 100,
        error_message: None,
        created_at: Utc::now(),
        started_at: Some(Utc::now()),
        completed_at: Some(Utc::now()),
        lease_expires_at: None,
    };

    let batch = Batch::try_from(row).expect("row converts");
    assert_eq!(batch.status, BatchStatus::Completed);
    assert!(batch.is_claimable(Utc::now()), "failed sends make it retryable");
}
