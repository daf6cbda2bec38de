//! GitHub tags API registry implementation

use std::time::Duration;

use crate::config::{FETCH_TIMEOUT_MS, RegistryKind};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::{normalize_version, parse_version};
use serde::Deserialize;
use tracing::warn;

/// Default base URL for GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Entry of the GitHub tags API response
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Registry implementation for the tags of a GitHub repository
pub struct GitHubRegistry {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    token: Option<String>,
}

impl GitHubRegistry {
    /// Creates a new GitHubRegistry with a custom base URL
    pub fn new(base_url: &str, owner: &str, token: Option<&str>) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent("update-notifier")
            .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            token: token.map(str::to_string),
        })
    }
}

#[async_trait::async_trait]
impl Registry for GitHubRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::GitHub
    }

    async fn fetch_latest(&self, package_name: &str) -> Result<String, RegistryError> {
        let repo = format!("{}/{}", self.owner, package_name);
        let url = format!("{}/repos/{}/tags?per_page=100", self.base_url, repo);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(repo));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RegistryError::Unauthorized(repo));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let tags: Vec<Tag> = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub tags response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        // Tags come back in ref order, not release order
        tags.into_iter()
            .filter_map(|tag| parse_version(&tag.name).map(|parsed| (tag.name, parsed)))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(name, _)| normalize_version(&name).to_string())
            .ok_or_else(|| RegistryError::NotFound(format!("{} has no version tags", repo)))
    }
}
