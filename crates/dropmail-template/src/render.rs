use dropmail_core::{Placeholder, RecipientRecord, TemplateConfig};

use crate::defaults::{default_value, DEFAULT_GREETING};
use crate::escape_html;
use crate::products::products_html;

/// Replaces `{{KEY}}` with its configured value for every key in `config`.
///
/// Tokens with no configured value are left in place.
#[must_use]
pub fn render_base(template_html_raw: &str, config: &TemplateConfig) -> String {
    let mut html = template_html_raw.to_string();
    for (key, value) in config.iter() {
        html = html.replace(&key.token(), value);
    }
    html
}

/// Effective placeholder values for one recipient.
///
/// Starts from the campaign config and overrides every institution-bound
/// field; the per-recipient value always wins.
#[must_use]
pub fn personalized_values(config: &TemplateConfig, record: &RecipientRecord) -> TemplateConfig {
    let mut values = config.clone();

    let greeting = match record.greeting_name() {
        Some(name) => format!("Hi {},", escape_html(name)),
        None => config
            .get(Placeholder::GreetingText)
            .unwrap_or(DEFAULT_GREETING)
            .to_string(),
    };
    values.set(Placeholder::GreetingText, greeting);

    if !record.institution_code.trim().is_empty() {
        let team = escape_html(record.institution_label().unwrap_or_default());
        values.set(
            Placeholder::ProductsTitle,
            format!("Featured {team} Collection"),
        );
        values.set(
            Placeholder::ProductsSubtitle,
            format!("We've selected these {team} exclusives just for you!"),
        );
        values.set(
            Placeholder::DescriptionText,
            format!("Check out the latest {team} collection, picked just for you!"),
        );
    }

    values.set(Placeholder::ProductsHtml, products_html(&record.products));

    let landing_page = if record.institution_page_url.trim().is_empty() {
        config
            .get(Placeholder::CtaLink)
            .unwrap_or_else(|| default_value(Placeholder::CtaLink))
            .to_string()
    } else {
        escape_html(&record.institution_page_url)
    };
    for link in Placeholder::ALL.into_iter().filter(|p| p.is_institution_link()) {
        values.set(link, landing_page.clone());
    }

    if !record.institution_logo_url.trim().is_empty() {
        values.set(
            Placeholder::HeroImageUrl,
            escape_html(&record.institution_logo_url),
        );
    }

    values
}

/// Renders the email body for one recipient.
///
/// After substituting the personalized values, any known placeholder still
/// present is filled with its built-in default, so no `{{KEY}}` token for a
/// known key survives.
#[must_use]
pub fn render_personalized(
    template_html_raw: &str,
    config: &TemplateConfig,
    record: &RecipientRecord,
) -> String {
    let values = personalized_values(config, record);
    let mut html = render_base(template_html_raw, &values);

    for key in Placeholder::ALL {
        let token = key.token();
        if html.contains(&token) {
            tracing::debug!(placeholder = %key, "filling unset placeholder with default");
            html = html.replace(&token, default_value(key));
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_config;
    use crate::skeleton::STANDARD_TEMPLATE;
    use chrono::Utc;
    use dropmail_core::ProductSlot;

    fn record() -> RecipientRecord {
        RecipientRecord {
            campaign_id: "c1".to_string(),
            record_id: "c1_0".to_string(),
            sequence: 0,
            batch_number: 1,
            recipient_email: "sam@example.com".to_string(),
            recipient_name: "Sam".to_string(),
            institution_code: "RAD".to_string(),
            institution_name: "Radford Highlanders".to_string(),
            products: vec![ProductSlot {
                link: "https://shop.example.com/products/tee-001".to_string(),
                image: "https://img.example.com/tee.png".to_string(),
                price: "19.99".to_string(),
                name: "Tee 12 inch".to_string(),
            }],
            institution_page_url: "https://shop.example.com/collections/radford".to_string(),
            institution_logo_url: "https://img.example.com/radford-logo.png".to_string(),
            email_sent: false,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn render_base_leaves_unmatched_tokens() {
        let mut config = TemplateConfig::new();
        config.set(Placeholder::MainTitle, "Hello");
        let out = render_base("<h1>{{MAIN_TITLE}}</h1><p>{{CTA_TEXT}}</p>{{UNKNOWN}}", &config);
        assert_eq!(out, "<h1>Hello</h1><p>{{CTA_TEXT}}</p>{{UNKNOWN}}");
    }

    #[test]
    fn render_base_is_idempotent() {
        let config = default_config();
        let first = render_base(STANDARD_TEMPLATE, &config);
        let second = render_base(STANDARD_TEMPLATE, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn personalized_leaves_no_known_placeholder() {
        let html = render_personalized(STANDARD_TEMPLATE, &TemplateConfig::new(), &record());
        for key in Placeholder::ALL {
            assert!(!html.contains(&key.token()), "{key} leaked into output");
        }
    }

    #[test]
    fn institution_fields_override_campaign_config() {
        let mut config = default_config();
        config.set(Placeholder::ProductsTitle, "Generic Title");
        config.set(Placeholder::CtaLink, "https://generic.example.com");
        let html = render_personalized(STANDARD_TEMPLATE, &config, &record());
        assert!(html.contains("Featured Radford Highlanders Collection"));
        assert!(!html.contains("Generic Title"));
        assert!(!html.contains("https://generic.example.com"));
        assert!(html.contains(r#"href="https://shop.example.com/collections/radford""#));
        assert!(html.contains("Hi Sam,"));
        assert!(html.contains("radford-logo.png"));
    }

    #[test]
    fn missing_name_uses_configured_greeting() {
        let mut rec = record();
        rec.recipient_name.clear();
        let mut config = TemplateConfig::new();
        config.set(Placeholder::GreetingText, "Hey fans,");
        let html = render_personalized("{{GREETING_TEXT}}", &config, &rec);
        assert_eq!(html, "Hey fans,");
    }

    #[test]
    fn missing_page_falls_back_to_configured_cta_link() {
        let mut rec = record();
        rec.institution_page_url.clear();
        let mut config = TemplateConfig::new();
        config.set(Placeholder::CtaLink, "https://shop.example.com");
        let html = render_personalized("{{HERO_LINK}}|{{SCHOOL_LINK}}", &config, &rec);
        assert_eq!(html, "https://shop.example.com|https://shop.example.com");
    }

    #[test]
    fn no_institution_keeps_campaign_products_title() {
        let mut rec = record();
        rec.institution_code.clear();
        rec.institution_name.clear();
        let mut config = TemplateConfig::new();
        config.set(Placeholder::ProductsTitle, "Staff Picks");
        let html = render_personalized("{{PRODUCTS_TITLE}}", &config, &rec);
        assert_eq!(html, "Staff Picks");
    }

    #[test]
    fn recipient_name_is_escaped() {
        let mut rec = record();
        rec.recipient_name = "<b>Sam</b>".to_string();
        let html = render_personalized("{{GREETING_TEXT}}", &TemplateConfig::new(), &rec);
        assert_eq!(html, "Hi &lt;b&gt;Sam&lt;/b&gt;,");
    }
}
