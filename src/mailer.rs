//! Best-effort outbound mail. Delivery failures are logged and swallowed;
//! no caller may observe them.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::warn;

use crate::config::EmailConfig;

pub trait Mailer: Send + Sync {
    /// Attempt delivery; never fails.
    fn send(&self, to: &str, subject: &str, body: &str);
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: lettre::message::Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();
        let from = config.from.parse()?;
        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) {
        let recipient = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!("skipping mail to invalid address {to}: {e}");
                return;
            }
        };
        let email = match Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .body(body.to_string())
        {
            Ok(email) => email,
            Err(e) => {
                warn!("failed to build mail for {to}: {e}");
                return;
            }
        };
        if let Err(e) = self.transport.send(&email) {
            warn!("failed to send mail to {to}: {e}");
        }
    }
}

/// Used when no SMTP server is configured.
pub struct NoopMailer;

impl Mailer for NoopMailer {
    fn send(&self, to: &str, subject: &str, _body: &str) {
        log::debug!("mail disabled, dropping message to {to}: {subject}");
    }
}
