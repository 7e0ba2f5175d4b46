//! # Issue Keys
//!
//! Extract Jira issue keys such as `SECO-42` from free text.
//!
//! A key is an upper-case letter, one to nine further upper-case letters or
//! digits, a hyphen and a number, delimited by word boundaries. Matching is
//! case-sensitive: `abc-123` is not a key, and neither is `ABCDEFGHIJK-1`
//! (the project part is capped at ten characters).
//!
//! Underscores are word characters, so a key glued to one is not matched:
//! branches named `SECO-42_login` or `feat_SECO-42` yield no key and the PR
//! is skipped. Separate the key with `/`, `-` or a space instead, as in
//! `feat/SECO-42-login`.
//!
//! ## Example
//!
//! ```
//! use jira_sync::{KeyExtractor, ProjectFilter};
//!
//! let extractor = KeyExtractor::new(ProjectFilter::parse("SECO"));
//! let key = extractor.first_key(&["feature/SECO-42-fix", "Unrelated", ""]);
//! assert_eq!(key.unwrap().as_str(), "SECO-42");
//! ```

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// Issue key pattern, word-bounded so over-long projects are rejected outright.
static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9]{1,9}-[0-9]+\b").unwrap());

/// A normalized Jira issue key (e.g. `SECO-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    fn from_match(text: &str) -> Self {
        Self(text.to_ascii_uppercase())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project prefix, i.e. everything before the hyphen.
    #[must_use]
    pub fn project(&self) -> &str {
        self.0.split_once('-').map_or(self.0.as_str(), |(project, _)| project)
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IssueKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Allow-list of Jira project prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectFilter {
    projects: BTreeSet<String>,
}

impl ProjectFilter {
    /// Parse a comma-separated project list such as `"SECO, ops"`.
    ///
    /// Entries are trimmed and upper-cased. Returns `None` when the list has
    /// no usable entries, which callers treat as "accept every project".
    #[must_use]
    pub fn parse(list: &str) -> Option<Self> {
        let filter: Self = list.split(',').collect();
        (!filter.projects.is_empty()).then_some(filter)
    }

    /// Whether keys from `project` pass the filter.
    #[must_use]
    pub fn allows(&self, project: &str) -> bool {
        self.projects.contains(project)
    }

    /// Configured projects in sorted order.
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProjectFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let projects = iter
            .into_iter()
            .map(|p| p.as_ref().trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { projects }
    }
}

/// Every key in `text`, in order of appearance, optionally restricted to
/// `allowed_projects`.
#[must_use]
pub fn extract_keys(text: &str, allowed_projects: Option<&ProjectFilter>) -> Vec<IssueKey> {
    KEY_PATTERN
        .find_iter(text)
        .map(|m| IssueKey::from_match(m.as_str()))
        .filter(|key| allowed_projects.is_none_or(|filter| filter.allows(key.project())))
        .collect()
}

/// First key of the first source that contains one.
///
/// Sources are scanned in order (branch, title, body for a PR); a source
/// without a match is skipped and results are never merged across sources.
#[must_use]
pub fn first_key(sources: &[&str], allowed_projects: Option<&ProjectFilter>) -> Option<IssueKey> {
    sources
        .iter()
        .find_map(|text| extract_keys(text, allowed_projects).into_iter().next())
}

/// All keys across `sources`, de-duplicated in order of first appearance.
#[must_use]
pub fn unique_keys(sources: &[&str], allowed_projects: Option<&ProjectFilter>) -> Vec<IssueKey> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .flat_map(|text| extract_keys(text, allowed_projects))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Key extraction bound to an optional project allow-list.
#[derive(Debug, Clone, Default)]
pub struct KeyExtractor {
    projects: Option<ProjectFilter>,
}

impl KeyExtractor {
    /// Create an extractor; `None` accepts keys from any project.
    #[must_use]
    pub fn new(projects: Option<ProjectFilter>) -> Self {
        Self { projects }
    }

    /// See [`extract_keys`].
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<IssueKey> {
        extract_keys(text, self.projects.as_ref())
    }

    /// See [`first_key`].
    #[must_use]
    pub fn first_key(&self, sources: &[&str]) -> Option<IssueKey> {
        first_key(sources, self.projects.as_ref())
    }

    /// See [`unique_keys`].
    #[must_use]
    pub fn unique_keys(&self, sources: &[&str]) -> Vec<IssueKey> {
        unique_keys(sources, self.projects.as_ref())
    }
}
