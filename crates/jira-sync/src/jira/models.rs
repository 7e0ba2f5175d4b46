//! Jira REST v3 request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Issue as returned by `GET /issue/{key}` (only the fields we ask for).
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<IssueStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueStatus {
    pub name: String,
}

/// Existing remote link on an issue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLink {
    pub id: u64,
    #[serde(default)]
    pub global_id: Option<String>,
    pub object: RemoteLinkObject,
}

impl RemoteLink {
    /// Whether this link already carries everything `request` would write.
    #[must_use]
    pub fn is_current(&self, request: &RemoteLinkRequest) -> bool {
        self.object.url == request.object.url
            && self.object.title == request.object.title
            && self.object.status == request.object.status
    }
}

/// Body for creating or updating a remote link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLinkRequest {
    /// Stable identity; Jira updates instead of duplicating on a repeat POST
    pub global_id: String,
    pub application: Application,
    pub relationship: String,
    pub object: RemoteLinkObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLinkObject {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    #[serde(rename = "url16x16", default, skip_serializing_if = "Option::is_none")]
    pub url_16x16: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Status block rendered next to the link (resolved links are struck through).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
}

/// Workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// A run of comment text, optionally hyperlinked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub link: Option<String>,
}

/// Single-paragraph comment, rendered as Atlassian Document Format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    segments: Vec<TextSegment>,
}

impl Comment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(TextSegment {
            text: text.into(),
            link: None,
        });
        self
    }

    #[must_use]
    pub fn link(mut self, text: impl Into<String>, href: impl Into<String>) -> Self {
        self.segments.push(TextSegment {
            text: text.into(),
            link: Some(href.into()),
        });
        self
    }

    /// Comment text without markup.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// ADF document for `POST /issue/{key}/comment`.
    #[must_use]
    pub fn to_adf(&self) -> Value {
        let content: Vec<Value> = self
            .segments
            .iter()
            .filter(|s| !s.text.is_empty())
            .map(|segment| match &segment.link {
                Some(href) => json!({
                    "type": "text",
                    "text": segment.text,
                    "marks": [{ "type": "link", "attrs": { "href": href } }]
                }),
                None => json!({ "type": "text", "text": segment.text }),
            })
            .collect();

        json!({
            "type": "doc",
            "version": 1,
            "content": [{ "type": "paragraph", "content": content }]
        })
    }
}
