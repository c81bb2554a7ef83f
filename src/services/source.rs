use crate::config::GitHubConfig;
use crate::models::RepoDescriptor;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// Code host capability: repository search plus clone transport.
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RepoDescriptor>>;

    /// Clones `clone_url` into `dest`, which must not exist yet.
    async fn clone_repo(&self, clone_url: &str, dest: &Path) -> Result<()>;
}

/// Builds `(language:a OR language:b) created:<start>..<end>`.
pub fn build_discovery_query(languages: &[String], lookback_days: u32, today: NaiveDate) -> String {
    let start = today - Duration::days(i64::from(lookback_days));
    let language_filter = languages
        .iter()
        .map(|lang| format!("language:{}", lang))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        "({}) created:{}..{}",
        language_filter,
        start.format("%Y-%m-%d"),
        today.format("%Y-%m-%d")
    )
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimit,
    search: Option<RateLimit>,
}

#[derive(Debug, Deserialize)]
struct RateLimit {
    limit: u64,
    remaining: u64,
}

/// GitHub search API plus the local `git` binary.
pub struct GitHubHost {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    clone_depth: Option<u32>,
}

impl GitHubHost {
    // search endpoint caps a page at 100 items
    const MAX_PER_PAGE: usize = 100;

    pub fn new(config: &GitHubConfig, clone_depth: Option<u32>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("repo-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            clone_depth,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check_status(res: reqwest::Response) -> Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    /// Probes the rate-limit endpoint, which also validates the token.
    pub async fn rate_limit(&self) -> Result<(u64, u64)> {
        let res = Self::check_status(self.get("/rate_limit").send().await?).await?;
        let body: RateLimitResponse = res.json().await?;
        let search = body.resources.search.unwrap_or(body.resources.core);
        Ok((search.remaining, search.limit))
    }
}

fn status_error(status: StatusCode, body: &str) -> anyhow::Error {
    match status {
        StatusCode::UNAUTHORIZED => anyhow!("authentication rejected: {}", body),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            anyhow!("rate limited ({}): {}", status, body)
        }
        _ => anyhow!("unexpected status {}: {}", status, body),
    }
}

fn ensure_search_budget(remaining: u64, limit: u64) -> Result<()> {
    if remaining == 0 {
        bail!("rate limited: search quota exhausted (0/{})", limit);
    }
    Ok(())
}

#[async_trait]
impl CodeHost for GitHubHost {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RepoDescriptor>> {
        let (remaining, total) = self.rate_limit().await?;
        tracing::info!("🔑 GitHub search rate limit: {}/{}", remaining, total);
        ensure_search_budget(remaining, total)?;

        let per_page = limit.clamp(1, Self::MAX_PER_PAGE).to_string();
        let res = self
            .get("/search/repositories")
            .query(&[("q", query), ("per_page", per_page.as_str())])
            .send()
            .await?;
        let body: SearchResponse = Self::check_status(res).await?.json().await?;

        Ok(body
            .items
            .into_iter()
            .map(|item| RepoDescriptor::new(item.name, item.clone_url))
            .collect())
    }

    async fn clone_repo(&self, clone_url: &str, dest: &Path) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg("--quiet");
        if let Some(depth) = self.clone_depth {
            cmd.arg("--depth").arg(depth.to_string());
        }
        // a URL starting with '-' must not be parsed as an option
        cmd.arg("--").arg(clone_url).arg(dest);
        // never block on a credential prompt
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        let output = cmd.output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!(
                "git clone exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}
