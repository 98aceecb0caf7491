use dropmail_core::{Placeholder, RecipientRecord, TemplateConfig};

use crate::defaults::DEFAULT_SUBJECT;

/// Campaign-level subject: the configured campaign title, or the default.
#[must_use]
pub fn base_subject(config: &TemplateConfig) -> &str {
    config
        .get(Placeholder::CampaignTitle)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBJECT)
}

/// Subject line for one recipient, built from their name and institution.
#[must_use]
pub fn personalized_subject(base: &str, record: &RecipientRecord) -> String {
    match (record.greeting_name(), record.institution_label()) {
        (Some(name), Some(team)) => format!("Hi {name}, {team} Collection Just Dropped!"),
        (Some(name), None) => format!("Hi {name}! {base}"),
        (None, Some(team)) => format!("{team} {base}"),
        (None, None) => base.to_string(),
    }
}
