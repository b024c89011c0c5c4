use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub schema: SchemaConfig,
    pub github: Option<GithubConfig>,
    pub mailgun: Option<MailgunConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Location of the base page schema document
    pub base_path: PathBuf,
}

/// Repository that serves raw page sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub username: String,
    pub repository: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailgunConfig {
    pub secret: String,
    pub domain: String,
    pub endpoint: Option<String>,
    pub from_address: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/page_cms.db".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            schema: SchemaConfig {
                base_path: env::var("BASE_SCHEMA_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("storage/schemas/post.json")),
            },
            github: Self::github_from_env(),
            mailgun: Self::mailgun_from_env(),
        })
    }

    fn github_from_env() -> Option<GithubConfig> {
        let username = non_empty_var("GITHUB_USERNAME")?;
        let repository = non_empty_var("GITHUB_REPOSITORY")?;
        Some(GithubConfig {
            username,
            repository,
            branch: non_empty_var("GITHUB_REPOSITORY_BRANCH").unwrap_or_else(|| "master".to_string()),
        })
    }

    fn mailgun_from_env() -> Option<MailgunConfig> {
        let secret = non_empty_var("MAILGUN_SECRET")?;
        let domain = non_empty_var("MAILGUN_DOMAIN")?;
        Some(MailgunConfig {
            secret,
            domain,
            endpoint: non_empty_var("MAILGUN_ENDPOINT"),
            from_address: non_empty_var("MAIL_FROM_ADDRESS"),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
