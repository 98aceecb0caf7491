use dropmail_core::{Placeholder, TemplateConfig};

pub const DEFAULT_SUBJECT: &str = "New Collection Available!";
pub const DEFAULT_GREETING: &str = "Hi there,";
pub const COMPANY_LOGO_URL: &str =
    "https://mcusercontent.com/8351ab2884b2416977322fb0e/images/4f7399b3-f8f9-8d7f-9b1e-4dd0ed5690cb.png";

/// Built-in value for a placeholder, used when a campaign config omits it.
#[must_use]
pub fn default_value(key: Placeholder) -> &'static str {
    match key {
        Placeholder::CampaignTitle => DEFAULT_SUBJECT,
        Placeholder::CompanyName => "R and R Imports, Inc",
        Placeholder::CompanyLogoUrl | Placeholder::HeroImageUrl => COMPANY_LOGO_URL,
        Placeholder::MainTitle => "New Collection Just Dropped!",
        Placeholder::TitleFontSize => "28px",
        Placeholder::TitleColor | Placeholder::CtaTextColor => "#000000",
        Placeholder::HeroLink
        | Placeholder::CtaLink
        | Placeholder::InstitutionLink
        | Placeholder::SchoolLink => "#",
        Placeholder::HeroAltText => "Campaign Hero Image",
        Placeholder::GreetingText => DEFAULT_GREETING,
        Placeholder::DescriptionText => "Check out our latest collection selected just for you!",
        Placeholder::ProductsTitle => "Featured Collection",
        Placeholder::ProductsSubtitle => "We've selected these exclusive items just for you!",
        Placeholder::ProductsHtml => "<!-- Products will be dynamically inserted here -->",
        Placeholder::CtaText => "Shop Collection",
        Placeholder::CtaBgColor => "#7ac4c9",
        Placeholder::CompanyAddress => "5271 Lee Hwy, Troutville, VA 24175-7555 USA",
        Placeholder::UnsubscribeUrl => {
            "https://r-and-r-awss3.s3.us-east-1.amazonaws.com/unsuscribe_button.html"
        }
    }
}

/// The config a new campaign starts with: every non-alias placeholder set to
/// its built-in value.
#[must_use]
pub fn default_config() -> TemplateConfig {
    Placeholder::ALL
        .into_iter()
        .filter(|p| !matches!(p, Placeholder::InstitutionLink | Placeholder::SchoolLink))
        .map(|p| (p, default_value(p).to_string()))
        .collect()
}

/// Default config with caller-supplied values layered on top.
#[must_use]
pub fn default_config_with(overrides: &TemplateConfig) -> TemplateConfig {
    let mut config = default_config();
    config.apply(overrides);
    config
}
