//! GitHub REST client for listing recently updated pull requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ENV_GITHUB_TOKEN;
use crate::error::MetricsError;
use jira_sync::ConfigError;

/// Maximum page size accepted by the pulls endpoint.
const PER_PAGE: usize = 100;

/// A pull request as returned by `GET /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub head: GitRef,
    #[serde(default)]
    pub user: Option<User>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

impl PullRequest {
    /// Text sources scanned for an issue key, in priority order.
    #[must_use]
    pub fn key_sources(&self) -> [&str; 3] {
        [
            &self.head.ref_name,
            &self.title,
            self.body.as_deref().unwrap_or_default(),
        ]
    }

    #[must_use]
    pub fn login(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.login.as_str())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    /// Closed with a merge timestamp.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        !self.is_open() && self.merged_at.is_some()
    }

    /// Hours from creation to merge, for merged pull requests.
    #[must_use]
    pub fn hours_to_merge(&self) -> Option<f64> {
        if !self.is_merged() {
            return None;
        }
        self.merged_at.map(|merged| hours_between(self.created_at, merged))
    }
}

/// Elapsed hours between two instants, negative if `end` precedes `start`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

#[derive(Serialize)]
struct PullsQuery {
    state: &'static str,
    sort: &'static str,
    direction: &'static str,
    per_page: usize,
    page: u32,
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    /// Create a client against `api_url`, optionally authenticated.
    ///
    /// Without a token requests are anonymous and subject to the lower
    /// unauthenticated rate limit.
    pub fn new(api_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, MetricsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pr-metrics/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                ConfigError::Invalid {
                    var: ENV_GITHUB_TOKEN,
                    value: "<redacted>".to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch pull requests updated at or after `since`, newest first.
    ///
    /// Pages through the pulls endpoint sorted by update time and stops at
    /// the first pull request older than `since`, an empty page, or a short
    /// page.
    pub async fn recent_pull_requests(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>, MetricsError> {
        let url = format!("{}/repos/{repo}/pulls", self.api_url);
        let mut prs = Vec::new();
        let mut page = 1;

        loop {
            debug!(repo, page, "Fetching pull requests");
            let query = PullsQuery {
                state: "all",
                sort: "updated",
                direction: "desc",
                per_page: PER_PAGE,
                page,
            };
            let response = self.client.get(&url).query(&query).send().await?;
            let batch: Vec<PullRequest> = handle_response(response).await?;
            let batch_len = batch.len();

            for pr in batch {
                if pr.updated_at < since {
                    info!(repo, count = prs.len(), "Reached pull requests outside the window");
                    return Ok(prs);
                }
                prs.push(pr);
            }

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        info!(repo, count = prs.len(), pages = page, "Fetched pull requests");
        Ok(prs)
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, MetricsError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MetricsError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}
