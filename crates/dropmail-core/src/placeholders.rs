//! The closed set of `{{KEY}}` placeholders a campaign template may carry,
//! and the per-campaign mapping of placeholder → value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Placeholder {
    CampaignTitle,
    CompanyName,
    CompanyLogoUrl,
    MainTitle,
    TitleFontSize,
    TitleColor,
    HeroImageUrl,
    HeroLink,
    HeroAltText,
    GreetingText,
    DescriptionText,
    ProductsTitle,
    ProductsSubtitle,
    ProductsHtml,
    CtaText,
    CtaLink,
    CtaBgColor,
    CtaTextColor,
    CompanyAddress,
    UnsubscribeUrl,
    /// Alias resolving to the recipient's institution page.
    InstitutionLink,
    /// Alias resolving to the recipient's institution page.
    SchoolLink,
}

impl Placeholder {
    pub const ALL: [Placeholder; 22] = [
        Placeholder::CampaignTitle,
        Placeholder::CompanyName,
        Placeholder::CompanyLogoUrl,
        Placeholder::MainTitle,
        Placeholder::TitleFontSize,
        Placeholder::TitleColor,
        Placeholder::HeroImageUrl,
        Placeholder::HeroLink,
        Placeholder::HeroAltText,
        Placeholder::GreetingText,
        Placeholder::DescriptionText,
        Placeholder::ProductsTitle,
        Placeholder::ProductsSubtitle,
        Placeholder::ProductsHtml,
        Placeholder::CtaText,
        Placeholder::CtaLink,
        Placeholder::CtaBgColor,
        Placeholder::CtaTextColor,
        Placeholder::CompanyAddress,
        Placeholder::UnsubscribeUrl,
        Placeholder::InstitutionLink,
        Placeholder::SchoolLink,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Placeholder::CampaignTitle => "CAMPAIGN_TITLE",
            Placeholder::CompanyName => "COMPANY_NAME",
            Placeholder::CompanyLogoUrl => "COMPANY_LOGO_URL",
            Placeholder::MainTitle => "MAIN_TITLE",
            Placeholder::TitleFontSize => "TITLE_FONT_SIZE",
            Placeholder::TitleColor => "TITLE_COLOR",
            Placeholder::HeroImageUrl => "HERO_IMAGE_URL",
            Placeholder::HeroLink => "HERO_LINK",
            Placeholder::HeroAltText => "HERO_ALT_TEXT",
            Placeholder::GreetingText => "GREETING_TEXT",
            Placeholder::DescriptionText => "DESCRIPTION_TEXT",
            Placeholder::ProductsTitle => "PRODUCTS_TITLE",
            Placeholder::ProductsSubtitle => "PRODUCTS_SUBTITLE",
            Placeholder::ProductsHtml => "PRODUCTS_HTML",
            Placeholder::CtaText => "CTA_TEXT",
            Placeholder::CtaLink => "CTA_LINK",
            Placeholder::CtaBgColor => "CTA_BG_COLOR",
            Placeholder::CtaTextColor => "CTA_TEXT_COLOR",
            Placeholder::CompanyAddress => "COMPANY_ADDRESS",
            Placeholder::UnsubscribeUrl => "UNSUBSCRIBE_URL",
            Placeholder::InstitutionLink => "INSTITUTION_LINK",
            Placeholder::SchoolLink => "SCHOOL_LINK",
        }
    }

    /// The literal `{{KEY}}` token as it appears in template HTML.
    #[must_use]
    pub fn token(self) -> String {
        format!("{{{{{}}}}}", self.key())
    }

    /// Link placeholders that always point at the recipient's institution page.
    #[must_use]
    pub fn is_institution_link(self) -> bool {
        matches!(
            self,
            Placeholder::HeroLink
                | Placeholder::CtaLink
                | Placeholder::InstitutionLink
                | Placeholder::SchoolLink
        )
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Placeholder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Placeholder::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| CoreError::UnknownPlaceholder(s.to_string()))
    }
}

/// Placeholder values for one campaign.
///
/// Keys are restricted to [`Placeholder`]; deserializing a map with an
/// unknown key fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateConfig(BTreeMap<Placeholder, String>);

impl TemplateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: Placeholder) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: Placeholder, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    pub fn remove(&mut self, key: Placeholder) -> Option<String> {
        self.0.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrites every key present in `changes`.
    pub fn apply(&mut self, changes: &TemplateConfig) {
        for (key, value) in changes.iter() {
            self.set(key, value);
        }
    }

    /// Builds a config from loosely-typed string pairs, rejecting unknown keys.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownPlaceholder`] for the first key that is not
    /// a known placeholder.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::new();
        for (key, value) in pairs {
            let key: Placeholder = key.as_ref().parse()?;
            config.set(key, value);
        }
        Ok(config)
    }
}

impl FromIterator<(Placeholder, String)> for TemplateConfig {
    fn from_iter<T: IntoIterator<Item = (Placeholder, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
