use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::debug;

use crate::config::MailConfig;

/// A single outbound plain-text message.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub subject: String,
    pub body: String,
    pub to: Vec<String>,
}

/// Why a send failed. Callers branch on the variant to pick the
/// user-visible notice; no send failure ever aborts the action that
/// triggered it.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail header: {0}")]
    BadHeader(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Outbound) -> Result<(), MailError>;
}

/// SMTP-backed mailer. Builds a fresh transport per send to avoid
/// connection pooling issues.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<SmtpTransport, MailError> {
        let mut builder = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }
        Ok(builder.build())
    }

    fn build_message(&self, mail: &Outbound) -> Result<Message, MailError> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|e| MailError::BadHeader(format!("from address: {e}")))?;
        let mut builder = Message::builder().from(from).subject(&mail.subject);
        for recipient in &mail.to {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| MailError::BadHeader(format!("to address: {e}")))?;
            builder = builder.to(to);
        }
        builder
            .body(mail.body.clone())
            .map_err(|e| MailError::BadHeader(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: Outbound) -> Result<(), MailError> {
        if mail.to.is_empty() {
            return Err(MailError::BadHeader("no recipients".into()));
        }
        let message = self.build_message(&mail)?;
        let transport = self.build_transport()?;

        // lettre's SmtpTransport is synchronous
        let result = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(format!("send task failed: {e}")))?;

        result.map_err(|e| MailError::Transport(e.to_string()))?;
        debug!(subject = %mail.subject, recipients = mail.to.len(), "mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.shop.test".into(),
            smtp_port: 587,
            smtp_username: "mailer".into(),
            smtp_password: "secret".into(),
            from_address: "noreply@shop.test".into(),
            admin_recipients: vec!["admin@shop.test".into()],
        }
    }

    #[test]
    fn builds_plain_text_message() {
        let mailer = SmtpMailer::new(test_config());
        let mail = Outbound {
            subject: "Order Confirmation".into(),
            body: "Thank you for your order!".into(),
            to: vec!["alice@shop.test".into()],
        };
        assert!(mailer.build_message(&mail).is_ok());
    }

    #[test]
    fn malformed_recipient_is_a_bad_header() {
        let mailer = SmtpMailer::new(test_config());
        let mail = Outbound {
            subject: "x".into(),
            body: "y".into(),
            to: vec!["not an address".into()],
        };
        let err = mailer.build_message(&mail).unwrap_err();
        assert!(matches!(err, MailError::BadHeader(_)));
    }

    #[test]
    fn malformed_from_is_a_bad_header() {
        let mut config = test_config();
        config.from_address = "broken".into();
        let mailer = SmtpMailer::new(config);
        let mail = Outbound {
            subject: "x".into(),
            body: "y".into(),
            to: vec!["alice@shop.test".into()],
        };
        let err = mailer.build_message(&mail).unwrap_err();
        assert!(matches!(err, MailError::BadHeader(_)));
    }

    #[tokio::test]
    async fn empty_recipient_list_is_rejected() {
        let mailer = SmtpMailer::new(test_config());
        let err = mailer
            .send(Outbound {
                subject: "x".into(),
                body: "y".into(),
                to: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::BadHeader(_)));
    }
}
