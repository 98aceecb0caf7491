//! Natural-language template edits: a pattern matcher for common requests,
//! falling back to the LLM for everything else.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use dropmail_core::{EditKind, Placeholder, TemplateConfig, TemplateInstance};
use regex::Regex;
use serde::Deserialize;

use crate::client::{Completion, CompletionRequest, Message};
use crate::error::AiError;
use crate::json::extract_json_block;

/// Config changes proposed for one request, with a human-readable summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditProposal {
    pub changes: TemplateConfig,
    pub explanation: String,
}

impl EditProposal {
    fn single(key: Placeholder, value: impl Into<String>, explanation: impl Into<String>) -> Self {
        let mut changes = TemplateConfig::new();
        changes.set(key, value);
        Self {
            changes,
            explanation: explanation.into(),
        }
    }
}

/// What an applied edit did to the template instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub kind: EditKind,
    pub changes: TemplateConfig,
    pub explanation: String,
}

struct StylePattern {
    re: Regex,
    key: Placeholder,
    value: &'static str,
    explanation: &'static str,
}

static STYLE_PATTERNS: LazyLock<Vec<StylePattern>> = LazyLock::new(|| {
    let p = |re: &str, key, value, explanation| StylePattern {
        re: Regex::new(re).expect("valid regex"),
        key,
        value,
        explanation,
    };
    vec![
        p(r"make.*title.*blue", Placeholder::TitleColor, "#0066cc", "Changed title color to blue"),
        p(r"make.*title.*red", Placeholder::TitleColor, "#cc0000", "Changed title color to red"),
        p(r"make.*title.*green", Placeholder::TitleColor, "#00cc66", "Changed title color to green"),
        p(r"make.*button.*blue", Placeholder::CtaBgColor, "#0066cc", "Changed button color to blue"),
        p(r"make.*button.*green", Placeholder::CtaBgColor, "#00cc66", "Changed button color to green"),
        p(r"make.*button.*red", Placeholder::CtaBgColor, "#cc0000", "Changed button color to red"),
        p(
            r"make.*title.*bigger|increase.*title.*size",
            Placeholder::TitleFontSize,
            "36px",
            "Increased title font size",
        ),
        p(
            r"make.*title.*smaller|decrease.*title.*size",
            Placeholder::TitleFontSize,
            "22px",
            "Decreased title font size",
        ),
    ]
});

static TITLE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:change|update).*title.*?(?:to|:)\s*["']?([^"']+)["']?"#)
        .expect("valid regex")
});

static BUTTON_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:change|update).*button.*?(?:to|:)\s*["']?([^"']+)["']?"#)
        .expect("valid regex")
});

fn text_change(request: &str, lower: &str, noun: &str, re: &Regex) -> Option<String> {
    if !lower.contains(&format!("change {noun}")) && !lower.contains(&format!("update {noun}")) {
        return None;
    }
    re.captures(request)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Handles title/button text, colour and title-size requests without a
/// model call. Returns `None` when the request needs the LLM.
#[must_use]
pub fn simple_edit(request: &str) -> Option<EditProposal> {
    let lower = request.to_lowercase();

    if let Some(title) = text_change(request, &lower, "title", &TITLE_TEXT_RE) {
        let explanation = format!("Changed title to: {title}");
        return Some(EditProposal::single(Placeholder::MainTitle, title, explanation));
    }
    if let Some(text) = text_change(request, &lower, "button", &BUTTON_TEXT_RE) {
        let explanation = format!("Changed button text to: {text}");
        return Some(EditProposal::single(Placeholder::CtaText, text, explanation));
    }

    STYLE_PATTERNS
        .iter()
        .find(|p| p.re.is_match(&lower))
        .map(|p| EditProposal::single(p.key, p.value, p.explanation))
}

/// Placeholders the model is allowed to change, with what each controls.
const EDITABLE: [(Placeholder, &str); 14] = [
    (Placeholder::CampaignTitle, "email subject line"),
    (Placeholder::MainTitle, "main headline text"),
    (Placeholder::TitleFontSize, "headline font size, e.g. '28px'"),
    (Placeholder::TitleColor, "headline colour as a hex code"),
    (Placeholder::HeroImageUrl, "hero banner image URL"),
    (Placeholder::HeroLink, "hero image link target"),
    (Placeholder::GreetingText, "greeting line"),
    (Placeholder::DescriptionText, "main description paragraph"),
    (Placeholder::ProductsTitle, "products section heading"),
    (Placeholder::ProductsSubtitle, "products section subheading"),
    (Placeholder::CtaText, "call-to-action button label"),
    (Placeholder::CtaBgColor, "button background colour"),
    (Placeholder::CtaTextColor, "button text colour"),
    (Placeholder::CtaLink, "button link target"),
];

fn advanced_system_prompt() -> String {
    let variables: String = EDITABLE
        .iter()
        .map(|(key, what)| format!("- {key}: {what}\n"))
        .collect();
    format!(
        "You edit HTML marketing email templates by changing template variables.\n\n\
         Variables you may change:\n{variables}\n\
         Change only what the user asks for. Keep values email-client safe: \
         web-safe fonts, hex colours, absolute URLs.\n\n\
         Reply with JSON only, in this shape:\n\
         {{\"success\": true, \"changes\": {{\"VARIABLE_NAME\": \"new value\"}}, \
         \"explanation\": \"what changed\"}}\n\
         If the request cannot be done with these variables, reply with \
         success false and say why in explanation."
    )
}

#[derive(Debug, Deserialize)]
struct AdvancedReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    changes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Keeps only changes naming a known placeholder; non-string values are
/// stored as their JSON text.
fn known_changes(raw: BTreeMap<String, serde_json::Value>) -> TemplateConfig {
    raw.into_iter()
        .filter_map(|(key, value)| match key.parse::<Placeholder>() {
            Ok(p) => {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((p, value))
            }
            Err(_) => {
                tracing::debug!(key = %key, "ignoring change to unknown placeholder");
                None
            }
        })
        .collect()
}

/// Asks the model for config changes fulfilling `request`.
///
/// # Errors
///
/// - [`AiError::NoJson`] / [`AiError::Deserialize`] when the reply is not the
///   expected JSON object.
/// - [`AiError::Rejected`] when the model reports it could not comply.
/// - Transport errors from the client.
pub async fn advanced_edit(
    client: &dyn Completion,
    request: &str,
    current: &TemplateConfig,
) -> Result<EditProposal, AiError> {
    let current_json = serde_json::to_string_pretty(current).map_err(|e| AiError::Deserialize {
        context: "template config".to_string(),
        source: e,
    })?;
    let user = format!(
        "Current template configuration:\n{current_json}\n\nUser request: {request}\n\n\
         Provide the changes needed to fulfil this request."
    );

    let reply = client
        .complete(&CompletionRequest {
            messages: vec![Message::system(advanced_system_prompt()), Message::user(user)],
            max_tokens: 2000,
            temperature: 0.3,
        })
        .await?;

    let block = extract_json_block(&reply).ok_or(AiError::NoJson)?;
    let parsed: AdvancedReply =
        serde_json::from_str(block).map_err(|e| AiError::Deserialize {
            context: "template edit reply".to_string(),
            source: e,
        })?;

    if !parsed.success {
        return Err(AiError::Rejected(
            parsed
                .explanation
                .unwrap_or_else(|| "AI could not process request".to_string()),
        ));
    }

    Ok(EditProposal {
        changes: known_changes(parsed.changes),
        explanation: parsed
            .explanation
            .unwrap_or_else(|| "AI made template modifications".to_string()),
    })
}

/// Applies `request` to `instance`, trying [`simple_edit`] before the model.
///
/// # Errors
///
/// Returns [`AiError::NotConfigured`] when the request needs the model and
/// no client is available, or any error from [`advanced_edit`].
pub async fn edit_template(
    client: Option<&dyn Completion>,
    instance: &mut TemplateInstance,
    request: &str,
) -> Result<EditOutcome, AiError> {
    let (kind, proposal) = match simple_edit(request) {
        Some(p) => (EditKind::Simple, p),
        None => {
            let client = client.ok_or(AiError::NotConfigured)?;
            let p = advanced_edit(client, request, &instance.template_config).await?;
            (EditKind::Advanced, p)
        }
    };

    instance.apply_changes(request, proposal.changes.clone(), kind);
    tracing::info!(
        campaign_id = %instance.campaign_id,
        kind = ?kind,
        explanation = %proposal.explanation,
        "template edited"
    );
    Ok(EditOutcome {
        kind,
        changes: proposal.changes,
        explanation: proposal.explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCompletion;

    fn instance() -> TemplateInstance {
        let mut config = TemplateConfig::new();
        config.set(Placeholder::MainTitle, "Old Title");
        config.set(Placeholder::CtaBgColor, "#7ac4c9");
        TemplateInstance::new("c1", "<h1>{{MAIN_TITLE}}</h1>", config)
    }

    #[test]
    fn title_colour() {
        let p = simple_edit("Make the title blue please").unwrap();
        assert_eq!(p.changes.get(Placeholder::TitleColor), Some("#0066cc"));
    }

    #[test]
    fn button_colour() {
        let p = simple_edit("make the button green").unwrap();
        assert_eq!(p.changes.get(Placeholder::CtaBgColor), Some("#00cc66"));
    }

    #[test]
    fn title_size() {
        let p = simple_edit("make the title bigger").unwrap();
        assert_eq!(p.changes.get(Placeholder::TitleFontSize), Some("36px"));
        let p = simple_edit("decrease title size").unwrap();
        assert_eq!(p.changes.get(Placeholder::TitleFontSize), Some("22px"));
    }

    #[test]
    fn title_text() {
        let p = simple_edit("Change title to \"Fall Drop 2025\"").unwrap();
        assert_eq!(p.changes.get(Placeholder::MainTitle), Some("Fall Drop 2025"));
        assert_eq!(p.explanation, "Changed title to: Fall Drop 2025");
    }

    #[test]
    fn button_text() {
        let p = simple_edit("update button to Buy Now").unwrap();
        assert_eq!(p.changes.get(Placeholder::CtaText), Some("Buy Now"));
    }

    #[test]
    fn unmatched_request_needs_model() {
        assert!(simple_edit("add a festive autumn feel").is_none());
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let mut raw = BTreeMap::new();
        raw.insert("MAIN_TITLE".to_string(), serde_json::json!("New"));
        raw.insert("FONT_FAMILY".to_string(), serde_json::json!("Comic Sans"));
        raw.insert("TITLE_FONT_SIZE".to_string(), serde_json::json!(30));
        let changes = known_changes(raw);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get(Placeholder::TitleFontSize), Some("30"));
    }

    #[tokio::test]
    async fn simple_edit_skips_the_model() {
        let mut mock = MockCompletion::new();
        mock.expect_complete().never();
        let client: &dyn Completion = &mock;

        let mut t = instance();
        let outcome = edit_template(Some(client), &mut t, "make the button red")
            .await
            .unwrap();
        assert_eq!(outcome.kind, EditKind::Simple);
        assert_eq!(t.template_config.get(Placeholder::CtaBgColor), Some("#cc0000"));
        assert_eq!(t.version_history.len(), 1);
    }

    #[tokio::test]
    async fn advanced_edit_applies_known_keys() {
        let mut mock = MockCompletion::new();
        mock.expect_complete()
            .withf(|req| req.max_tokens == 2000 && (req.temperature - 0.3).abs() < f32::EPSILON)
            .times(1)
            .returning(|_| {
                Ok("```json\n{\"success\": true, \"changes\": {\"GREETING_TEXT\": \"Howdy,\", \
                    \"BOGUS\": \"x\"}, \"explanation\": \"Friendlier greeting\"}\n```"
                    .to_string())
            });
        let client: &dyn Completion = &mock;

        let mut t = instance();
        let outcome = edit_template(Some(client), &mut t, "sound more southern")
            .await
            .unwrap();
        assert_eq!(outcome.kind, EditKind::Advanced);
        assert_eq!(outcome.explanation, "Friendlier greeting");
        assert_eq!(t.template_config.get(Placeholder::GreetingText), Some("Howdy,"));
        assert_eq!(t.template_config.get(Placeholder::MainTitle), Some("Old Title"));
        assert_eq!(t.version_history[0].processing_type, EditKind::Advanced);
    }

    #[tokio::test]
    async fn model_refusal_leaves_config_untouched() {
        let mut mock = MockCompletion::new();
        mock.expect_complete().returning(|_| {
            Ok(r#"{"success": false, "explanation": "Cannot add video"}"#.to_string())
        });
        let client: &dyn Completion = &mock;

        let mut t = instance();
        let err = edit_template(Some(client), &mut t, "embed a video")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Rejected(ref m) if m == "Cannot add video"));
        assert!(t.version_history.is_empty());
    }

    #[tokio::test]
    async fn advanced_request_without_client() {
        let mut t = instance();
        let err = edit_template(None, &mut t, "rewrite everything")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::NotConfigured));
    }
}
