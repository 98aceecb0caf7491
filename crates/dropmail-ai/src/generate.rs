//! Campaign copy generated from a sample of the uploaded catalog.

use dropmail_core::{Placeholder, ProductRow, TemplateConfig};
use serde::{Deserialize, Serialize};

use crate::client::{Completion, CompletionRequest, Message};
use crate::error::AiError;
use crate::json::extract_json_block;

/// Rows of the catalog shown to the model.
pub const SAMPLE_SIZE: usize = 5;

/// Copy suggestions for a campaign. Fields missing from the model's reply
/// take their fallback value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedContent {
    pub campaign_title: String,
    pub subject_lines: Vec<String>,
    pub main_headline: String,
    pub description: String,
    pub cta_text: String,
    pub product_type: String,
}

impl Default for GeneratedContent {
    fn default() -> Self {
        Self {
            campaign_title: "New Collection Available".to_string(),
            subject_lines: vec!["Check out our latest collection!".to_string()],
            main_headline: "New Products Just Dropped!".to_string(),
            description: "Discover our latest collection of high-quality merchandise."
                .to_string(),
            cta_text: "Shop Now".to_string(),
            product_type: "merchandise".to_string(),
        }
    }
}

impl GeneratedContent {
    /// Template values implied by this content. The first subject line, when
    /// present, becomes the email subject.
    #[must_use]
    pub fn template_changes(&self) -> TemplateConfig {
        let subject = self
            .subject_lines
            .first()
            .unwrap_or(&self.campaign_title)
            .clone();
        [
            (Placeholder::CampaignTitle, subject),
            (Placeholder::MainTitle, self.main_headline.clone()),
            (Placeholder::DescriptionText, self.description.clone()),
            (Placeholder::CtaText, self.cta_text.clone()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .collect()
    }
}

#[derive(Serialize)]
struct SampleProduct<'a> {
    title: &'a str,
    price: &'a str,
    sku: &'a str,
    option: &'a str,
}

fn prompt(rows: &[ProductRow]) -> String {
    let samples: Vec<SampleProduct<'_>> = rows
        .iter()
        .take(SAMPLE_SIZE)
        .map(|r| SampleProduct {
            title: &r.title,
            price: &r.price,
            sku: &r.sku,
            option: &r.option1_value,
        })
        .collect();
    let samples = serde_json::to_string_pretty(&samples).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Here are sample products from a college merchandise campaign:\n{samples}\n\n\
         Write campaign copy that works for any college: never name a specific school. \
         Work out what kind of products these are.\n\n\
         Reply with JSON only:\n\
         {{\"campaign_title\": \"campaign name, at most 60 characters\", \
         \"subject_lines\": [\"five subject lines, each at most 50 characters\"], \
         \"main_headline\": \"headline, at most 80 characters\", \
         \"description\": \"two or three sentences about the collection\", \
         \"cta_text\": \"button label, at most 20 characters\", \
         \"product_type\": \"e.g. hats, apparel, accessories\"}}"
    )
}

/// Asks the model for campaign copy based on the first catalog rows.
///
/// An unparseable reply yields [`GeneratedContent::default`].
///
/// # Errors
///
/// Returns transport and API errors from the client.
pub async fn generate_content(
    client: &dyn Completion,
    rows: &[ProductRow],
) -> Result<GeneratedContent, AiError> {
    let request = CompletionRequest {
        messages: vec![
            Message::system(
                "You are an email marketing copywriter. Always answer with valid JSON only.",
            ),
            Message::user(prompt(rows)),
        ],
        max_tokens: 800,
        temperature: 0.7,
    };
    let reply = client.complete(&request).await?;

    let parsed = extract_json_block(&reply)
        .and_then(|block| serde_json::from_str::<GeneratedContent>(block).ok());
    Ok(parsed.unwrap_or_else(|| {
        tracing::warn!(reply = %reply, "could not parse generated content; using fallback");
        GeneratedContent::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCompletion;

    fn row(i: usize) -> ProductRow {
        ProductRow {
            handle: format!("p{i}"),
            title: format!("Product {i}"),
            sku: format!("P{i}-C-RAD1"),
            option1_name: "Size".to_string(),
            option1_value: "One".to_string(),
            option2_name: None,
            option2_value: None,
            price: "10.00".to_string(),
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn prompt_carries_only_first_five_rows() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .withf(|req| {
                let user = &req.messages[1].content;
                user.contains("Product 4") && !user.contains("Product 5")
            })
            .returning(|_| Ok(r#"{"campaign_title": "Cap Season", "product_type": "hats"}"#.to_string()));
        let client: &dyn Completion = &mock;

        let rows: Vec<_> = (0..8).map(row).collect();
        let content = generate_content(client, &rows).await.unwrap();
        assert_eq!(content.campaign_title, "Cap Season");
        assert_eq!(content.product_type, "hats");
        // Missing fields fall back.
        assert_eq!(content.cta_text, "Shop Now");
    }

    #[tokio::test]
    async fn garbage_reply_falls_back() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .returning(|_| Ok("Sorry, I can't help with that.".to_string()));
        let client: &dyn Completion = &mock;

        let content = generate_content(client, &[row(0)]).await.unwrap();
        assert_eq!(content, GeneratedContent::default());
    }

    #[test]
    fn template_changes_prefer_first_subject_line() {
        let content = GeneratedContent {
            subject_lines: vec!["Caps are back".to_string(), "Other".to_string()],
            description: " ".to_string(),
            ..GeneratedContent::default()
        };
        let changes = content.template_changes();
        assert_eq!(changes.get(Placeholder::CampaignTitle), Some("Caps are back"));
        assert_eq!(changes.get(Placeholder::CtaText), Some("Shop Now"));
        assert!(changes.get(Placeholder::DescriptionText).is_none());
    }
}
