// Raw page sources served from a GitHub repository

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GithubConfig;
use crate::error::{AppError, AppResult};

pub const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

#[derive(Clone)]
pub struct RawContentClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    repository: String,
    branch: String,
}

impl RawContentClient {
    pub fn new(config: &GithubConfig) -> AppResult<Self> {
        Self::with_base_url(GITHUB_RAW_BASE, config)
    }

    pub fn with_base_url(base_url: &str, config: &GithubConfig) -> AppResult<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(format!("page-cms v{}", version))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            repository: config.repository.clone(),
            branch: config.branch.clone(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/pages/{}",
            self.base_url,
            self.username,
            self.repository,
            self.branch,
            path.trim_start_matches('/')
        )
    }

    /// Fetch a raw page source. A missing file is `Ok(None)`; any other
    /// failure is reported as [`AppError::RemoteUnavailable`].
    pub async fn fetch(&self, path: &str) -> AppResult<Option<String>> {
        if path.split('/').any(|segment| segment == "..") {
            return Err(AppError::BadRequest(format!("Invalid page path: {}", path)));
        }

        let url = self.url_for(path);
        debug!("Fetching raw page source {}", url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Raw content request to {} failed: {}", url, e);
            AppError::RemoteUnavailable(format!("Failed to fetch {}: {}", path, e))
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await.map_err(|e| {
                    AppError::RemoteUnavailable(format!("Failed to read {}: {}", path, e))
                })?;
                Ok(Some(body))
            }
            status => {
                warn!("Raw content host answered {} for {}", status, url);
                Err(AppError::RemoteUnavailable(format!(
                    "Raw content host answered {} for {}",
                    status, path
                )))
            }
        }
    }
}
