//! Jira Cloud REST v3 client.
//!
//! API Documentation: <https://developer.atlassian.com/cloud/jira/platform/rest/v3/>

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::models::{Comment, Issue, RemoteLink, RemoteLinkRequest, Transition, TransitionsResponse};
use super::IssueTracker;
use crate::config::JiraConfig;
use crate::error::JiraError;
use crate::keys::IssueKey;

/// REST API prefix appended to the site URL.
const API_PREFIX: &str = "/rest/api/3";

/// Jira REST client authenticated with email + API token.
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    base_url: String,
    user_email: String,
    api_token: String,
}

impl JiraClient {
    /// Create a client from connection settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &JiraConfig) -> Result<Self, JiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_email: config.user_email.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user_email, Some(&self.api_token))
    }

    /// Make an authenticated GET request.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, JiraError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let response = self.authed(self.client.get(&url)).send().await?;
        Self::handle_response(response).await
    }

    /// Make an authenticated request whose response body is not needed.
    async fn send_json<B: serde::Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<(), JiraError> {
        let response = self.authed(request).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(Self::status_error(status, text))
        }
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, JiraError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse Jira response");
                JiraError::Serialization(e)
            })
        } else {
            Err(Self::status_error(status, text))
        }
    }

    fn status_error(status: StatusCode, message: String) -> JiraError {
        if status == StatusCode::NOT_FOUND {
            JiraError::NotFound(message)
        } else {
            JiraError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn get_issue(&self, key: &IssueKey) -> Result<Issue, JiraError> {
        self.get(&format!("/issue/{key}?fields=summary,status")).await
    }

    async fn remote_links(&self, key: &IssueKey) -> Result<Vec<RemoteLink>, JiraError> {
        self.get(&format!("/issue/{key}/remotelink")).await
    }

    async fn create_remote_link(
        &self,
        key: &IssueKey,
        link: &RemoteLinkRequest,
    ) -> Result<(), JiraError> {
        let url = self.url(&format!("/issue/{key}/remotelink"));
        debug!(url = %url, "POST remote link");
        self.send_json(self.client.post(&url), link).await
    }

    async fn update_remote_link(
        &self,
        key: &IssueKey,
        link_id: u64,
        link: &RemoteLinkRequest,
    ) -> Result<(), JiraError> {
        let url = self.url(&format!("/issue/{key}/remotelink/{link_id}"));
        debug!(url = %url, "PUT remote link");
        self.send_json(self.client.put(&url), link).await
    }

    async fn add_comment(&self, key: &IssueKey, comment: &Comment) -> Result<(), JiraError> {
        let url = self.url(&format!("/issue/{key}/comment"));
        debug!(url = %url, "POST comment");
        self.send_json(self.client.post(&url), &json!({ "body": comment.to_adf() }))
            .await
    }

    async fn transitions(&self, key: &IssueKey) -> Result<Vec<Transition>, JiraError> {
        let response: TransitionsResponse = self.get(&format!("/issue/{key}/transitions")).await?;
        Ok(response.transitions)
    }

    async fn transition(&self, key: &IssueKey, transition_id: &str) -> Result<(), JiraError> {
        let url = self.url(&format!("/issue/{key}/transitions"));
        debug!(url = %url, transition_id, "POST transition");
        self.send_json(
            self.client.post(&url),
            &json!({ "transition": { "id": transition_id } }),
        )
        .await
    }
}
