use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    content::SchemaStore,
    infrastructure::SqliteDatabase,
    mail::Mailer,
    services::{PageService, RawContentClient},
};

#[derive(Clone)]
pub struct AppState {
    pub page_service: Arc<PageService>,
    pub raw_content: Option<RawContentClient>,
    pub mailer: Option<Mailer>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // A missing or unreadable base schema stops startup
        let schemas = Arc::new(SchemaStore::new(config.schema.base_path.clone()));
        schemas.preload()?;

        let database = SqliteDatabase::connect(&config.database.url).await?;
        let page_service = Arc::new(PageService::new(&database, schemas));

        let raw_content = match &config.github {
            Some(github) => Some(RawContentClient::new(github)?),
            None => {
                info!("GITHUB_USERNAME/GITHUB_REPOSITORY not set, raw page sources disabled");
                None
            }
        };

        let mailer = match &config.mailgun {
            Some(mailgun) => {
                let mailer = Mailer::from_config(mailgun)?;
                info!("Sending mail through Mailgun as {}", mailer.from());
                Some(mailer)
            }
            None => {
                info!("MAILGUN_SECRET/MAILGUN_DOMAIN not set, outbound mail disabled");
                None
            }
        };

        Ok(Self {
            page_service,
            raw_content,
            mailer,
        })
    }

    pub fn from_parts(page_service: PageService, raw_content: Option<RawContentClient>) -> Self {
        Self {
            page_service: Arc::new(page_service),
            raw_content,
            mailer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, MailgunConfig, SchemaConfig, ServerConfig};

    fn config(dir: &std::path::Path, mailgun: Option<MailgunConfig>) -> Config {
        Config {
            database: DatabaseConfig {
                url: format!("sqlite:{}/pages.db", dir.display()),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            schema: SchemaConfig {
                base_path: dir.join("post.json"),
            },
            github: None,
            mailgun,
        }
    }

    #[tokio::test]
    async fn test_mailer_built_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("post.json"), r#"{"category": "post", "sections": []}"#).unwrap();

        let state = AppState::new(&config(
            dir.path(),
            Some(MailgunConfig {
                secret: "key".to_string(),
                domain: "mg.example.com".to_string(),
                endpoint: None,
                from_address: Some("Site <site@example.com>".to_string()),
            }),
        ))
        .await
        .unwrap();
        let mailer = state.mailer.unwrap();
        assert_eq!(mailer.from().to_string(), "Site <site@example.com>");
        assert!(state.raw_content.is_none());

        let without_mail = AppState::new(&config(dir.path(), None)).await.unwrap();
        assert!(without_mail.mailer.is_none());
    }

    #[tokio::test]
    async fn test_missing_schema_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(&config(dir.path(), None)).await.is_err());
    }
}
