use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Most products a single recipient record can carry.
pub const MAX_PRODUCT_SLOTS: usize = 4;

/// A person in the recipient directory, tagged with one institution code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub institution_code: String,
    /// Where the address came from (import file, signup form, ...).
    #[serde(default)]
    pub source: Option<String>,
}

/// One product carried on a recipient record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSlot {
    pub link: String,
    pub image: String,
    /// Stored string; never reformatted.
    pub price: String,
    pub name: String,
}

/// What a single recipient will be sent for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    pub campaign_id: String,
    /// `"{campaign_id}_{sequence}"`.
    pub record_id: String,
    /// Position in fan-out order; record ids do not sort numerically.
    pub sequence: u64,
    pub batch_number: u32,
    pub recipient_email: String,
    pub recipient_name: String,
    pub institution_code: String,
    pub institution_name: String,
    pub products: Vec<ProductSlot>,
    pub institution_page_url: String,
    pub institution_logo_url: String,
    pub email_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RecipientRecord {
    #[must_use]
    pub fn record_id_for(campaign_id: &str, sequence: u64) -> String {
        format!("{campaign_id}_{sequence}")
    }

    /// Product slot by 1-based position.
    #[must_use]
    pub fn slot(&self, position: usize) -> Option<&ProductSlot> {
        position
            .checked_sub(1)
            .and_then(|i| self.products.get(i))
    }

    /// Price in 1-based slot `position`, or `""` when the slot is empty.
    #[must_use]
    pub fn product_price(&self, position: usize) -> &str {
        self.slot(position).map_or("", |s| s.price.as_str())
    }

    /// First name-ish greeting target, `None` when the directory had no name.
    #[must_use]
    pub fn greeting_name(&self) -> Option<&str> {
        let name = self.recipient_name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Institution display name, falling back to the code.
    #[must_use]
    pub fn institution_label(&self) -> Option<&str> {
        let name = self.institution_name.trim();
        if !name.is_empty() {
            return Some(name);
        }
        let code = self.institution_code.trim();
        (!code.is_empty()).then_some(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Ready,
    Sending,
    Completed,
    Failed,
}

impl BatchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Ready => "ready",
            BatchStatus::Sending => "sending",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(BatchStatus::Ready),
            "sending" => Ok(BatchStatus::Sending),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(CoreError::InvalidStatus {
                kind: "batch",
                value: other.to_string(),
            }),
        }
    }
}

/// Send-lifecycle marker for one fixed-size group of recipient records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub campaign_id: String,
    pub batch_number: u32,
    pub status: BatchStatus,
    pub total_emails: u32,
    pub emails_sent: u32,
    pub failed_emails: u32,
    pub progress_percent: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Held by the dispatcher that moved the batch to `sending`.
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl Batch {
    #[must_use]
    pub fn ready(campaign_id: &str, batch_number: u32, total_emails: u32) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            batch_number,
            status: BatchStatus::Ready,
            total_emails,
            emails_sent: 0,
            failed_emails: 0,
            progress_percent: 0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            lease_expires_at: None,
        }
    }

    /// Whether a dispatcher may move this batch to `sending` at `now`.
    ///
    /// `ready` batches are claimable; so is a `sending` batch whose lease has
    /// lapsed, and a `completed` batch that still has failed sends to retry.
    /// `failed` is terminal.
    #[must_use]
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BatchStatus::Ready => true,
            BatchStatus::Sending => self.lease_expires_at.is_none_or(|until| until <= now),
            BatchStatus::Completed => self.failed_emails > 0,
            BatchStatus::Failed => false,
        }
    }
}

/// Whole-number completion percentage, clamped to 100.
#[must_use]
pub fn progress_percent(sent: u32, failed: u32, total: u32) -> u32 {
    if total == 0 {
        return 100;
    }
    let done = u64::from(sent) + u64::from(failed);
    let pct = (done * 100) / u64::from(total);
    u32::try_from(pct.min(100)).unwrap_or(100)
}
