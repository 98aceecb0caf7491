use async_trait::async_trait;
use dropmail_core::AppConfig;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::error::SendError;
use crate::provider::{EmailProvider, OutgoingEmail};

const IMPLICIT_TLS_PORT: u16 = 465;

/// [`EmailProvider`] over an SMTP relay (SES SMTP endpoint or a local
/// catcher in development).
#[derive(Clone)]
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    /// Builds a transport for `host:port`.
    ///
    /// Port 465 uses implicit TLS, loopback hosts use plaintext, everything
    /// else negotiates STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Smtp`] if the TLS parameters for `host` cannot
    /// be built.
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
    ) -> Result<Self, SendError> {
        let builder = if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else if is_loopback(host) {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        }
        .port(port);

        let builder = match credentials {
            Some((username, password)) => builder.credentials(Credentials::new(username, password)),
            None => builder,
        };

        Ok(Self {
            transport: builder.build(),
        })
    }

    /// # Errors
    ///
    /// Returns [`SendError::Smtp`] if the transport cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, SendError> {
        let credentials = config
            .smtp_username
            .clone()
            .zip(config.smtp_password.clone());
        Self::new(&config.smtp_host, config.smtp_port, credentials)
    }
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

fn mailbox(address: &str) -> Result<Mailbox, SendError> {
    address.parse().map_err(|source| SendError::Address {
        address: address.to_string(),
        source,
    })
}

/// Builds the MIME message for one outgoing email.
pub(crate) fn build_message(email: &OutgoingEmail) -> Result<Message, SendError> {
    Ok(Message::builder()
        .from(mailbox(&email.from)?)
        .reply_to(mailbox(&email.reply_to)?)
        .to(mailbox(&email.to)?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(email.html_body.clone())?)
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, SendError> {
        let message = build_message(email)?;
        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(SendError::Rejected(response.message().collect::<Vec<_>>().join(" ")));
        }
        let message_id = response.message().next().map(str::to_string);
        tracing::debug!(to = %email.to, message_id = ?message_id, "email accepted by relay");
        Ok(message_id)
    }
}
