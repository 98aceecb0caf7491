//! Rendering one recipient's email without sending it.

use dropmail_core::Store;
use dropmail_template::{base_subject, personalized_subject, render_personalized};
use serde::Serialize;

use crate::dispatch::load_rendering;
use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailPreview {
    pub recipient_email: String,
    pub institution_code: String,
    pub batch_number: u32,
    pub subject: String,
    pub html: String,
}

/// Renders the email the recipient with `email` would receive.
///
/// Returns `None` when the campaign has no record for that address.
///
/// # Errors
///
/// Returns [`DispatchError::CampaignNotFound`] for an unknown campaign and
/// [`DispatchError::Store`] on lookup failures.
pub async fn preview_email<S: Store + ?Sized>(
    store: &S,
    campaign_id: &str,
    email: &str,
) -> Result<Option<EmailPreview>, DispatchError> {
    let rendering = load_rendering(store, campaign_id).await?;
    let Some(record) = store.find_record_by_email(campaign_id, email).await? else {
        return Ok(None);
    };

    Ok(Some(EmailPreview {
        subject: personalized_subject(base_subject(&rendering.config), &record),
        html: render_personalized(&rendering.html, &rendering.config, &record),
        recipient_email: record.recipient_email,
        institution_code: record.institution_code,
        batch_number: record.batch_number,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dropmail_core::memory::MemoryStore;
    use dropmail_core::{
        Campaign, CampaignStore, Placeholder, ProductSlot, RecipientRecord, RecordStore,
        TemplateConfig,
    };

    async fn store_with_record() -> MemoryStore {
        let store = MemoryStore::new();
        let mut config = TemplateConfig::new();
        config.set(Placeholder::CampaignTitle, "Caps are back");
        store
            .create_campaign(&Campaign::new("c1", "Caps", "", config))
            .await
            .unwrap();
        store
            .put_records(&[RecipientRecord {
                campaign_id: "c1".to_string(),
                record_id: RecipientRecord::record_id_for("c1", 0),
                sequence: 0,
                batch_number: 1,
                recipient_email: "sam@example.com".to_string(),
                recipient_name: "Sam".to_string(),
                institution_code: "RAD".to_string(),
                institution_name: "Radford Highlanders".to_string(),
                products: vec![ProductSlot {
                    link: "https://shop.example.com/products/cap".to_string(),
                    image: String::new(),
                    price: "25.00".to_string(),
                    name: "Cap".to_string(),
                }],
                institution_page_url: String::new(),
                institution_logo_url: String::new(),
                email_sent: false,
                sent_at: None,
                created_at: Utc::now(),
            }])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn preview_renders_recipient_subject_and_body() {
        let store = store_with_record().await;
        let preview = preview_email(&store, "c1", "SAM@example.com")
            .await
            .unwrap()
            .expect("record exists");
        assert_eq!(preview.institution_code, "RAD");
        assert!(preview.subject.starts_with("Hi Sam"));
        assert!(preview.html.contains("Cap"));
        assert!(!preview.html.contains("{{"));
    }

    #[tokio::test]
    async fn unknown_address_yields_none() {
        let store = store_with_record().await;
        assert!(preview_email(&store, "c1", "nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_campaign_is_an_error() {
        let store = MemoryStore::new();
        let err = preview_email(&store, "nope", "sam@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::CampaignNotFound(_)));
    }
}
