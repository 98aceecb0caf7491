//! Outbound email: the provider seam, an SMTP provider, and the batch
//! dispatch loop that walks a campaign's recipient records.

pub mod dispatch;
pub mod error;
pub mod preview;
pub mod provider;
pub mod smtp;
pub mod test_send;

pub use dispatch::{send_batch, DispatchConfig, DispatchOutcome};
pub use error::{DispatchError, SendError};
pub use preview::{preview_email, EmailPreview};
pub use provider::{EmailProvider, OutgoingEmail};
pub use smtp::SmtpProvider;
pub use test_send::{send_test, TestSendResult};
