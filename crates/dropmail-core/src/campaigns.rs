use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::placeholders::TemplateConfig;
use crate::CoreError;

pub const MAX_VERSION_HISTORY: usize = 50;
pub const MAX_CHAT_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Ready,
    Sending,
    Completed,
}

impl CampaignStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Ready => "ready",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "ready" => Ok(CampaignStatus::Ready),
            "sending" => Ok(CampaignStatus::Sending),
            "completed" => Ok(CampaignStatus::Completed),
            other => Err(CoreError::InvalidStatus {
                kind: "campaign",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_id: String,
    pub name: String,
    pub description: String,
    pub status: CampaignStatus,
    pub template_config: TemplateConfig,
    /// Blob key of the uploaded catalog CSV.
    pub file_s3_key: Option<String>,
    pub file_name: Option<String>,
    pub batch_count: u32,
    pub total_emails: u32,
    pub emails_sent: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_processed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    #[must_use]
    pub fn new(
        campaign_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        template_config: TemplateConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            campaign_id: campaign_id.into(),
            name: name.into(),
            description: description.into(),
            status: CampaignStatus::Draft,
            template_config,
            file_s3_key: None,
            file_name: None,
            batch_count: 0,
            total_emails: 0,
            emails_sent: 0,
            created_at: now,
            updated_at: now,
            file_processed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Simple,
    Advanced,
    Generated,
    Restore,
}

/// A prior template config plus what changed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub timestamp: DateTime<Utc>,
    pub user_request: String,
    pub changes_made: TemplateConfig,
    pub processing_type: EditKind,
    pub previous_config: TemplateConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The per-campaign HTML skeleton with its current values and edit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInstance {
    pub campaign_id: String,
    pub template_html_raw: String,
    pub template_config: TemplateConfig,
    pub version_history: Vec<VersionEntry>,
    pub chat_history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl TemplateInstance {
    #[must_use]
    pub fn new(
        campaign_id: impl Into<String>,
        template_html_raw: impl Into<String>,
        template_config: TemplateConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            campaign_id: campaign_id.into(),
            template_html_raw: template_html_raw.into(),
            template_config,
            version_history: Vec::new(),
            chat_history: Vec::new(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Applies `changes`, recording the prior config in the version history.
    pub fn apply_changes(
        &mut self,
        user_request: impl Into<String>,
        changes: TemplateConfig,
        processing_type: EditKind,
    ) {
        let previous_config = self.template_config.clone();
        self.template_config.apply(&changes);
        self.push_version(VersionEntry {
            timestamp: Utc::now(),
            user_request: user_request.into(),
            changes_made: changes,
            processing_type,
            previous_config,
        });
    }

    /// Replaces the config with a historic one; the current config is pushed
    /// onto the history first so the restore itself can be undone.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VersionOutOfRange`] if `index` names no entry.
    pub fn restore_version(&mut self, index: usize) -> Result<(), CoreError> {
        let entry = self
            .version_history
            .get(index)
            .cloned()
            .ok_or(CoreError::VersionOutOfRange {
                index,
                len: self.version_history.len(),
            })?;
        let previous_config = std::mem::replace(
            &mut self.template_config,
            entry.previous_config.clone(),
        );
        self.push_version(VersionEntry {
            timestamp: Utc::now(),
            user_request: format!("restore version {index}"),
            changes_made: entry.previous_config,
            processing_type: EditKind::Restore,
            previous_config,
        });
        Ok(())
    }

    fn push_version(&mut self, entry: VersionEntry) {
        self.version_history.push(entry);
        trim_front(&mut self.version_history, MAX_VERSION_HISTORY);
        self.last_modified = Utc::now();
    }

    pub fn push_chat(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
        trim_front(&mut self.chat_history, MAX_CHAT_HISTORY);
        self.last_modified = Utc::now();
    }
}

fn trim_front<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}

/// An address that receives test sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAccount {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_test_code")]
    pub school_code: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_test_code() -> String {
    "TEST".to_string()
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholders::Placeholder;

    fn instance() -> TemplateInstance {
        let mut config = TemplateConfig::new();
        config.set(Placeholder::MainTitle, "Original");
        TemplateInstance::new("c1", "<h1>{{MAIN_TITLE}}</h1>", config)
    }

    fn change(title: &str) -> TemplateConfig {
        let mut c = TemplateConfig::new();
        c.set(Placeholder::MainTitle, title);
        c
    }

    #[test]
    fn apply_changes_records_previous_config() {
        let mut t = instance();
        t.apply_changes("rename", change("Renamed"), EditKind::Simple);
        assert_eq!(t.template_config.get(Placeholder::MainTitle), Some("Renamed"));
        assert_eq!(t.version_history.len(), 1);
        assert_eq!(
            t.version_history[0].previous_config.get(Placeholder::MainTitle),
            Some("Original")
        );
    }

    #[test]
    fn version_history_is_capped() {
        let mut t = instance();
        for i in 0..(MAX_VERSION_HISTORY + 7) {
            t.apply_changes(format!("edit {i}"), change(&i.to_string()), EditKind::Advanced);
        }
        assert_eq!(t.version_history.len(), MAX_VERSION_HISTORY);
        assert_eq!(t.version_history[0].user_request, "edit 7");
    }

    #[test]
    fn chat_history_is_capped() {
        let mut t = instance();
        for i in 0..(MAX_CHAT_HISTORY + 3) {
            t.push_chat(ChatMessage::new(ChatRole::User, i.to_string()));
        }
        assert_eq!(t.chat_history.len(), MAX_CHAT_HISTORY);
        assert_eq!(t.chat_history[0].content, "3");
    }

    #[test]
    fn restore_version_brings_back_previous_config() {
        let mut t = instance();
        t.apply_changes("first", change("One"), EditKind::Simple);
        t.apply_changes("second", change("Two"), EditKind::Simple);
        t.restore_version(0).unwrap();
        assert_eq!(t.template_config.get(Placeholder::MainTitle), Some("Original"));
        let last = t.version_history.last().unwrap();
        assert_eq!(last.processing_type, EditKind::Restore);
        assert_eq!(last.previous_config.get(Placeholder::MainTitle), Some("Two"));
    }

    #[test]
    fn restore_version_out_of_range() {
        let mut t = instance();
        let err = t.restore_version(3).unwrap_err();
        assert!(matches!(err, CoreError::VersionOutOfRange { index: 3, len: 0 }));
    }

    #[test]
    fn test_account_defaults() {
        let acct: TestAccount = serde_json::from_str(r#"{"email":"qa@example.com"}"#).unwrap();
        assert_eq!(acct.school_code, "TEST");
        assert!(acct.active);
    }
}
