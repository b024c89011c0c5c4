//! Outbound mail.
//!
//! Messages are built with `lettre` and handed to a [`MailTransport`] as a
//! formatted MIME document. The only transport shipped is
//! [`MailgunTransport`], which posts that document to the Mailgun HTTP API.

pub mod mailgun;

use async_trait::async_trait;
use lettre::message::{MultiPart, SinglePart};
use lettre::Message;
use std::sync::Arc;

use crate::config::MailgunConfig;
use crate::error::{AppError, AppResult};

pub use lettre::message::Mailbox;
pub use mailgun::MailgunTransport;

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub bcc: Vec<Mailbox>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

impl MailMessage {
    pub fn new(from: Mailbox, subject: impl Into<String>, text_body: impl Into<String>) -> Self {
        Self {
            from,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            text_body: text_body.into(),
            html_body: None,
        }
    }

    pub fn to(mut self, mailbox: Mailbox) -> Self {
        self.to.push(mailbox);
        self
    }

    pub fn cc(mut self, mailbox: Mailbox) -> Self {
        self.cc.push(mailbox);
        self
    }

    pub fn bcc(mut self, mailbox: Mailbox) -> Self {
        self.bcc.push(mailbox);
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Every recipient: To, then Cc, then Bcc.
    pub fn all_contacts(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    pub fn number_of_recipients(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Build the `lettre` message. Bcc recipients go into the envelope only.
    pub fn build(&self) -> AppResult<Message> {
        // Header values may not carry line breaks
        let subject: String = self.subject.chars().filter(|c| !c.is_control()).collect();
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .message_id(Some(format!(
                "<{}@{}>",
                uuid::Uuid::new_v4().simple(),
                self.from.email.domain()
            )))
            .date_now();
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.bcc {
            builder = builder.bcc(mailbox.clone());
        }

        let message = match &self.html_body {
            None => builder.singlepart(SinglePart::plain(self.text_body.clone())),
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                self.text_body.clone(),
                html.clone(),
            )),
        };
        message.map_err(|e| AppError::Validation(format!("Invalid mail message: {}", e)))
    }

    /// The message as a MIME document, without a Bcc header.
    pub fn to_mime(&self) -> AppResult<String> {
        let formatted = self.build()?.formatted();
        String::from_utf8(formatted)
            .map_err(|e| AppError::Internal(format!("MIME document is not UTF-8: {}", e)))
    }
}

/// Delivers a message and reports how many recipients it was sent to
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> AppResult<usize>;
}

/// A transport paired with the sender address used for outgoing mail
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(transport: Arc<dyn MailTransport>, from: Mailbox) -> Self {
        Self { transport, from }
    }

    /// Mailgun-backed mailer. Without `MAIL_FROM_ADDRESS` the sender is
    /// `no-reply@{domain}`.
    pub fn from_config(config: &MailgunConfig) -> AppResult<Self> {
        let address = config
            .from_address
            .clone()
            .unwrap_or_else(|| format!("no-reply@{}", config.domain));
        let from = address.parse::<Mailbox>().map_err(|e| {
            AppError::ConfigurationError(format!("Invalid sender address {}: {}", address, e))
        })?;
        let transport = MailgunTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), from))
    }

    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Start a message from the configured sender.
    pub fn message(&self, subject: impl Into<String>, text_body: impl Into<String>) -> MailMessage {
        MailMessage::new(self.from.clone(), subject, text_body)
    }

    pub async fn send(&self, message: &MailMessage) -> AppResult<usize> {
        self.transport.send(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn mailbox(text: &str) -> Mailbox {
        text.parse().unwrap()
    }

    fn message() -> MailMessage {
        MailMessage::new(mailbox("Site <site@example.com>"), "Hello", "Body text")
            .to(mailbox("Ann <ann@example.com>"))
            .cc(mailbox("bob@example.com"))
            .bcc(mailbox("hidden@example.com"))
    }

    fn header_lines(mime: &str) -> Vec<&str> {
        mime.split("\r\n").take_while(|line| !line.is_empty()).collect()
    }

    #[test]
    fn test_mailbox_display() {
        assert_eq!(mailbox("Ann <ann@example.com>").to_string(), "Ann <ann@example.com>");
        assert_eq!(mailbox("bob@example.com").to_string(), "bob@example.com");
    }

    #[test]
    fn test_mime_hides_bcc() {
        let mime = message().to_mime().unwrap();
        let headers = header_lines(&mime);
        assert!(headers.contains(&"To: Ann <ann@example.com>"));
        assert!(headers.contains(&"Cc: bob@example.com"));
        assert!(headers.contains(&"Subject: Hello"));
        assert!(!mime.contains("hidden@example.com"));
        assert!(mime.contains("Body text"));
        assert_eq!(message().number_of_recipients(), 3);
    }

    #[test]
    fn test_mime_with_html_alternative() {
        let mime = message().html("<p>Body</p>").to_mime().unwrap();
        assert!(mime.contains("multipart/alternative"));
        assert!(mime.contains("text/html"));
        assert!(mime.contains("Content-Transfer-Encoding:"));
        assert!(mime.contains("<p>Body</p>"));
    }

    #[test]
    fn test_non_ascii_headers_are_encoded() {
        let mime = MailMessage::new(mailbox("Zoë <zoe@example.com>"), "Café", "Crème brûlée")
            .to(mailbox("ann@example.com"))
            .to_mime()
            .unwrap();
        assert!(mime.is_ascii());
        assert!(!mime.contains("Café"));
        assert!(header_lines(&mime).iter().any(|line| line.starts_with("Subject: =?")));
    }

    #[test]
    fn test_subject_cannot_inject_headers() {
        let mime = MailMessage::new(mailbox("a@example.com"), "Hi\r\nBcc: x@evil.com", "b")
            .to(mailbox("ann@example.com"))
            .to_mime()
            .unwrap();
        assert!(!header_lines(&mime).iter().any(|line| line.starts_with("Bcc:")));
    }

    #[test]
    fn test_message_without_recipients_is_rejected() {
        let result = MailMessage::new(mailbox("a@example.com"), "Hi", "b").to_mime();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[derive(Default)]
    struct RecordingTransport {
        subjects: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: &MailMessage) -> AppResult<usize> {
            self.subjects.lock().unwrap().push(message.subject.clone());
            Ok(message.number_of_recipients())
        }
    }

    fn mailgun_config(from_address: Option<&str>) -> MailgunConfig {
        MailgunConfig {
            secret: "key".to_string(),
            domain: "mg.example.com".to_string(),
            endpoint: None,
            from_address: from_address.map(str::to_string),
        }
    }

    #[test]
    fn test_mailer_sender_from_config() {
        let named = Mailer::from_config(&mailgun_config(Some("Site <site@example.com>"))).unwrap();
        assert_eq!(named.from().to_string(), "Site <site@example.com>");

        let fallback = Mailer::from_config(&mailgun_config(None)).unwrap();
        assert_eq!(fallback.from().to_string(), "no-reply@mg.example.com");

        assert!(matches!(
            Mailer::from_config(&mailgun_config(Some("not an address"))),
            Err(AppError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_mailer_sends_from_configured_sender() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = Mailer::new(transport.clone(), mailbox("site@example.com"));

        let message = mailer.message("Welcome", "Hi").to(mailbox("ann@example.com"));
        assert_eq!(message.from, mailbox("site@example.com"));
        assert_eq!(mailer.send(&message).await.unwrap(), 1);
        assert_eq!(*transport.subjects.lock().unwrap(), vec!["Welcome".to_string()]);
    }
}
