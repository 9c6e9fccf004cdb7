//! GitHub contents API implementation of [`RepositoryClient`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Url;
use tracing::{debug, info};

use drive_mirror_core::contract::{RepoContent, RepoEntry, RepositoryClient, ServiceError};

use crate::google_drive::ensure_success;

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    owner: String,
    repo: String,
    api_base: String,
}

impl GitHubClient {
    pub const API_BASE: &'static str = "https://api.github.com";

    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.filter(|t| !t.trim().is_empty()),
            owner: owner.into(),
            repo: repo.into(),
            api_base: Self::API_BASE.to_string(),
        }
    }

    /// Client for `owner/repo`, authenticated with `GITHUB_TOKEN` when set.
    pub fn from_env(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let token = std::env::var(GITHUB_TOKEN_ENV).ok();
        let client = Self::new(owner, repo, token);
        info!(
            owner = %client.owner,
            repo = %client.repo,
            authenticated = client.token.is_some(),
            "Initialized GitHubClient from environment"
        );
        client
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}`, each segment percent-encoded.
    fn contents_url(&self, path: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.api_base)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| "GitHub API base URL cannot carry a path")?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"]);
            if path.is_empty() {
                segments.push("");
            } else {
                segments.extend(path.split('/'));
            }
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        action: &str,
    ) -> Result<T, ServiceError> {
        let mut request = self
            .http
            .get(url)
            .header(USER_AGENT, "drive-mirror")
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = ensure_success(request.send().await?, action).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn list_root(&self) -> Result<Vec<RepoEntry>, ServiceError> {
        let url = self.contents_url("")?;
        debug!(url = %url, "Listing repository root");
        self.get_json(url, "list repository contents").await
    }

    async fn fetch_file(&self, path: &str) -> Result<RepoContent, ServiceError> {
        let url = self.contents_url(path)?;
        debug!(url = %url, "Fetching repository file");
        self.get_json(url, "fetch repository file").await
    }
}
