pub mod templates;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// A single plain-text email.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outbound mail transport. One call is one delivery attempt.
#[async_trait]
pub trait MailNotifier: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String>;
}

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SystemMailer {
    /// Port 465 speaks implicit TLS; any other port upgrades with STARTTLS.
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let builder = builder.map_err(|e| format!("System SMTP error: {e}"))?;

        let transport = builder.port(config.port).credentials(creds).build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailNotifier for SystemMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String> {
        let message = Message::builder()
            .from(
                mail.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.text.clone())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}

/// Stand-in used when SMTP is not configured: the mail goes to the log.
pub struct LogMailer;

#[async_trait]
impl MailNotifier for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), String> {
        tracing::warn!(
            to = %mail.to,
            subject = %mail.subject,
            "System SMTP not configured. Mail body: {}",
            mail.text
        );
        Ok(())
    }
}
