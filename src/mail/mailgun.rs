use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{info, warn};

use super::{MailMessage, MailTransport};
use crate::config::MailgunConfig;
use crate::error::{AppError, AppResult};

pub const DEFAULT_ENDPOINT: &str = "api.mailgun.net";

/// Sends MIME messages through the Mailgun HTTP API
#[derive(Clone)]
pub struct MailgunTransport {
    client: reqwest::Client,
    key: String,
    domain: String,
    endpoint: String,
}

impl MailgunTransport {
    pub fn new(
        client: reqwest::Client,
        key: impl Into<String>,
        domain: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            client,
            key: key.into(),
            domain: domain.into(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }

    pub fn from_config(config: &MailgunConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::new(
            client,
            config.secret.clone(),
            config.domain.clone(),
            config.endpoint.clone(),
        ))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    /// The `messages.mime` URL. Endpoints without a scheme are reached over HTTPS.
    pub fn messages_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            format!("{}/v3/{}/messages.mime", endpoint, self.domain)
        } else {
            format!("https://{}/v3/{}/messages.mime", endpoint, self.domain)
        }
    }

    /// The `to` form field: every recipient, Bcc included, comma separated.
    pub fn recipients_field(message: &MailMessage) -> String {
        message
            .all_contacts()
            .map(|mailbox| mailbox.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn payload(message: &MailMessage) -> AppResult<Form> {
        let part = Part::text(message.to_mime()?)
            .file_name("message.mime")
            .mime_str("message/rfc822")
            .map_err(|e| AppError::Internal(format!("Invalid MIME type: {}", e)))?;
        Ok(Form::new()
            .text("to", Self::recipients_field(message))
            .part("message", part))
    }
}

#[async_trait]
impl MailTransport for MailgunTransport {
    async fn send(&self, message: &MailMessage) -> AppResult<usize> {
        let url = self.messages_url();
        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.key))
            .multipart(Self::payload(message)?)
            .send()
            .await
            .map_err(|e| {
                warn!("Mailgun request failed: {}", e);
                AppError::RemoteUnavailable(format!("Mailgun request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mailgun rejected message: {} {}", status, body);
            return Err(AppError::RemoteUnavailable(format!(
                "Mailgun answered {}: {}",
                status, body
            )));
        }

        let recipients = message.number_of_recipients();
        info!("Sent \"{}\" to {} recipient(s) via Mailgun", message.subject, recipients);
        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Mailbox;
    use axum::{
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Captured {
        domain: String,
        authorization: String,
        body: String,
    }

    async fn capture(
        State(captured): State<Arc<Mutex<Captured>>>,
        Path(domain): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let mut captured = captured.lock().unwrap();
        captured.domain = domain;
        captured.authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        captured.body = String::from_utf8_lossy(&body).to_string();
        StatusCode::OK
    }

    async fn fake_mailgun(status_ok: bool) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let app = if status_ok {
            Router::new()
                .route("/v3/{domain}/messages.mime", post(capture))
                .with_state(captured.clone())
        } else {
            Router::new().route(
                "/v3/{domain}/messages.mime",
                post(|| async { StatusCode::UNAUTHORIZED }),
            )
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    fn message() -> MailMessage {
        let mailbox = |text: &str| -> Mailbox { text.parse().unwrap() };
        MailMessage::new(mailbox("site@example.com"), "Welcome", "Hi there")
            .to(mailbox("Ann <ann@example.com>"))
            .bcc(mailbox("hidden@example.com"))
    }

    #[test]
    fn test_messages_url() {
        let transport = MailgunTransport::new(reqwest::Client::new(), "key", "mg.example.com", None);
        assert_eq!(
            transport.messages_url(),
            "https://api.mailgun.net/v3/mg.example.com/messages.mime"
        );
    }

    #[test]
    fn test_recipients_field_includes_bcc() {
        assert_eq!(
            MailgunTransport::recipients_field(&message()),
            "Ann <ann@example.com>,hidden@example.com"
        );
    }

    #[test]
    fn test_key_and_domain_accessors() {
        let mut transport = MailgunTransport::new(reqwest::Client::new(), "k1", "d1", None);
        transport.set_key("k2");
        transport.set_domain("d2");
        assert_eq!(transport.key(), "k2");
        assert_eq!(transport.domain(), "d2");
    }

    #[tokio::test]
    async fn test_send_posts_mime() {
        let (endpoint, captured) = fake_mailgun(true).await;
        let transport =
            MailgunTransport::new(reqwest::Client::new(), "secret", "mg.example.com", Some(endpoint));

        let sent = transport.send(&message()).await.unwrap();
        assert_eq!(sent, 2);

        let captured = captured.lock().unwrap();
        assert_eq!(captured.domain, "mg.example.com");
        assert!(captured.authorization.starts_with("Basic "));
        assert!(captured.body.contains("name=\"to\""));
        assert!(captured.body.contains("Ann <ann@example.com>,hidden@example.com"));
        assert!(captured.body.contains("filename=\"message.mime\""));
        assert!(captured.body.contains("Subject: Welcome"));
        assert!(!captured.body.contains("Bcc:"));
    }

    #[tokio::test]
    async fn test_rejection_is_remote_unavailable() {
        let (endpoint, _) = fake_mailgun(false).await;
        let transport =
            MailgunTransport::new(reqwest::Client::new(), "bad", "mg.example.com", Some(endpoint));
        assert!(matches!(
            transport.send(&message()).await,
            Err(AppError::RemoteUnavailable(_))
        ));
    }
}
