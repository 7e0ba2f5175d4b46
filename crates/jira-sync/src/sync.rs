//! # PR Event Sync
//!
//! Maps a pull request event onto Jira side effects.
//!
//! | action | merged | effect |
//! |---|---|---|
//! | opened, reopened, ready_for_review, synchronize | - | link, "opened/updated" comment, in-review transition |
//! | closed | true | link (resolved), "merged" comment with merge SHA, done transition |
//! | closed | false | link (resolved), "closed without merge" comment |
//! | anything else, or no key | - | skipped |
//!
//! The issue is verified before anything is written; if that fails the run
//! fails. After verification every step is best-effort: a failed link,
//! comment or transition becomes a warning and the next step still runs.

use tracing::{info, warn};

use crate::annotations::{Annotation, AnnotationLevel};
use crate::config::TransitionConfig;
use crate::error::SyncError;
use crate::event::{PrAction, PrState, PullRequestEvent};
use crate::jira::models::{Application, Icon, LinkStatus, RemoteLinkObject};
use crate::jira::{Comment, IssueTracker, RemoteLinkRequest, Transition};
use crate::keys::{IssueKey, KeyExtractor};

/// Icon shown next to GitHub remote links.
const GITHUB_ICON_URL: &str = "https://github.githubassets.com/favicons/favicon.png";

/// Why an event produced no Jira activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No payload file was provided
    NoPayload,
    /// The payload is not a `pull_request` event
    NotPullRequest,
    /// No issue key in branch, title or body
    NoKey,
    /// The action has no mapping (labeled, edited, ...)
    UnhandledAction(String),
}

impl SkipReason {
    /// Informational annotation for the CI log.
    #[must_use]
    pub fn annotation(&self) -> Annotation {
        let message = match self {
            Self::NoPayload => "No event payload; nothing to sync.".to_string(),
            Self::NotPullRequest => "Event is not a pull_request event; nothing to sync.".to_string(),
            Self::NoKey => "No Jira key found in PR; nothing to sync.".to_string(),
            Self::UnhandledAction(action) => {
                format!("Pull request action '{action}' is not synced to Jira; nothing to do.")
            }
        };
        Annotation::notice(message)
    }
}

/// Remote-link step result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    /// Link existed with stale status and was rewritten
    Updated,
    /// Link existed and was already current
    AlreadyPresent,
    Failed,
}

/// Transition step result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This action never transitions (closed without merge)
    NotApplicable,
    /// No transition name configured for this step
    NotConfigured,
    /// Nothing available on the issue matched the configured name
    NoMatch(String),
    Applied(String),
    Failed(String),
}

/// Side effects of a completed sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub key: IssueKey,
    pub link: LinkOutcome,
    pub comment_posted: bool,
    pub transition: TransitionOutcome,
    pub annotations: Vec<Annotation>,
}

impl SyncReport {
    /// Whether any step was reported as a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| a.level == AnnotationLevel::Warning)
    }
}

/// Result of running the engine on one event.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Completed(SyncReport),
}

impl SyncOutcome {
    /// Annotations to print for this outcome.
    #[must_use]
    pub fn annotations(&self) -> Vec<Annotation> {
        match self {
            Self::Skipped(reason) => vec![reason.annotation()],
            Self::Completed(report) => report.annotations.clone(),
        }
    }
}

/// Which configured transition a lifecycle step drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionTarget {
    InReview,
    Done,
}

/// What to do for one (action, merged) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPlan {
    Updated,
    Merged,
    ClosedUnmerged,
}

impl SyncPlan {
    fn for_event(event: &PullRequestEvent) -> Option<Self> {
        match (&event.action, event.merged) {
            (
                PrAction::Opened
                | PrAction::Reopened
                | PrAction::ReadyForReview
                | PrAction::Synchronize,
                _,
            ) => Some(Self::Updated),
            (PrAction::Closed, true) => Some(Self::Merged),
            (PrAction::Closed, false) => Some(Self::ClosedUnmerged),
            (PrAction::Other(_), _) => None,
        }
    }

    fn transition(self) -> Option<TransitionTarget> {
        match self {
            Self::Updated => Some(TransitionTarget::InReview),
            Self::Merged => Some(TransitionTarget::Done),
            Self::ClosedUnmerged => None,
        }
    }
}

/// Status label for the remote link: merged, open, otherwise closed.
#[must_use]
pub fn link_status_label(state: PrState, merged: bool) -> &'static str {
    if merged {
        "Merged"
    } else if state == PrState::Open {
        "Open"
    } else {
        "Closed"
    }
}

/// Remote link body for a pull request.
#[must_use]
pub fn remote_link_request(event: &PullRequestEvent) -> RemoteLinkRequest {
    let summary = (!event.head_ref.is_empty() || !event.base_ref.is_empty())
        .then(|| format!("{} → {}", event.head_ref, event.base_ref));

    RemoteLinkRequest {
        global_id: event.html_url.clone(),
        application: Application {
            kind: "com.github".to_string(),
            name: "GitHub".to_string(),
        },
        relationship: "Pull Request".to_string(),
        object: RemoteLinkObject {
            url: event.html_url.clone(),
            title: format!("PR #{}: {}", event.number, event.title),
            summary,
            icon: Some(Icon {
                url_16x16: Some(GITHUB_ICON_URL.to_string()),
                title: Some("GitHub".to_string()),
            }),
            status: Some(LinkStatus {
                resolved: event.merged || event.state == PrState::Closed,
                icon: Some(Icon {
                    url_16x16: None,
                    title: Some(link_status_label(event.state, event.merged).to_string()),
                }),
            }),
        },
    }
}

fn comment_for(plan: SyncPlan, event: &PullRequestEvent) -> Comment {
    let pr = format!("PR #{} \"{}\"", event.number, event.title);
    let comment = match plan {
        SyncPlan::Updated => {
            let verb = match event.action {
                PrAction::Opened => "opened",
                PrAction::Reopened => "reopened",
                PrAction::ReadyForReview => "marked ready for review",
                _ => "updated",
            };
            Comment::new().text(format!("{pr} {verb} by @{}: ", event.actor()))
        }
        SyncPlan::Merged => {
            let commit = event
                .merge_commit_sha
                .as_deref()
                .map_or_else(|| "unknown commit".to_string(), |sha| format!("commit {sha}"));
            let into = if event.base_ref.is_empty() {
                String::new()
            } else {
                format!(" into {}", event.base_ref)
            };
            Comment::new().text(format!(
                "{pr} merged{into} by @{} ({commit}): ",
                event.actor()
            ))
        }
        SyncPlan::ClosedUnmerged => Comment::new().text(format!(
            "{pr} closed without merge by @{}: ",
            event.actor()
        )),
    };
    comment.link(&event.html_url, &event.html_url)
}

/// Find a transition by exact id or case-insensitive name.
#[must_use]
pub fn find_transition<'a>(available: &'a [Transition], wanted: &str) -> Option<&'a Transition> {
    let wanted = wanted.trim();
    let wanted_lower = wanted.to_lowercase();
    available
        .iter()
        .find(|t| t.id == wanted || t.name.to_lowercase() == wanted_lower)
}

/// An event that will be synced: the issue key and the lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSync {
    pub key: IssueKey,
    plan: SyncPlan,
}

/// Decide whether `event` is synced, without touching the network or
/// reading credentials.
///
/// # Errors
/// Returns the [`SkipReason`] when there is no key or the action is not
/// synced.
pub fn prepare(
    extractor: &KeyExtractor,
    event: &PullRequestEvent,
) -> Result<PreparedSync, SkipReason> {
    let Some(key) = extractor.first_key(&event.key_sources()) else {
        info!(pr = event.number, "No Jira key found in PR");
        return Err(SkipReason::NoKey);
    };

    let Some(plan) = SyncPlan::for_event(event) else {
        info!(pr = event.number, action = %event.action, "Ignoring pull request action");
        return Err(SkipReason::UnhandledAction(event.action.to_string()));
    };

    Ok(PreparedSync { key, plan })
}

/// Runs the sync for one event against an [`IssueTracker`].
pub struct SyncEngine<T> {
    tracker: T,
    extractor: KeyExtractor,
    transitions: TransitionConfig,
}

impl<T: IssueTracker> SyncEngine<T> {
    #[must_use]
    pub fn new(tracker: T, extractor: KeyExtractor, transitions: TransitionConfig) -> Self {
        Self {
            tracker,
            extractor,
            transitions,
        }
    }

    /// The underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Sync one event.
    ///
    /// # Errors
    /// Returns [`SyncError::IssueUnavailable`] when the issue cannot be
    /// fetched; no link, comment or transition call is made in that case.
    pub async fn run(&self, event: &PullRequestEvent) -> Result<SyncOutcome, SyncError> {
        match prepare(&self.extractor, event) {
            Ok(prepared) => self.execute(prepared, event).await.map(SyncOutcome::Completed),
            Err(reason) => Ok(SyncOutcome::Skipped(reason)),
        }
    }

    /// Apply a prepared sync to Jira.
    ///
    /// # Errors
    /// Same as [`SyncEngine::run`].
    pub async fn execute(
        &self,
        prepared: PreparedSync,
        event: &PullRequestEvent,
    ) -> Result<SyncReport, SyncError> {
        let PreparedSync { key, plan } = prepared;
        info!(pr = event.number, key = %key, action = %event.action, "Syncing pull request");

        let issue = self
            .tracker
            .get_issue(&key)
            .await
            .map_err(|source| SyncError::IssueUnavailable {
                key: key.clone(),
                source,
            })?;
        info!(
            key = %issue.key,
            status = issue.fields.status.as_ref().map_or("", |s| s.name.as_str()),
            "Verified Jira issue"
        );

        let mut annotations = Vec::new();
        let link = self.ensure_remote_link(&key, event, &mut annotations).await;
        let comment_posted = self
            .post_comment(&key, &comment_for(plan, event), &mut annotations)
            .await;
        let transition = self.apply_transition(&key, plan, &mut annotations).await;

        annotations.push(Annotation::notice(format!(
            "Synced PR #{} with {key} (link: {}, comment: {}, transition: {})",
            event.number,
            describe_link(link),
            if comment_posted { "posted" } else { "failed" },
            describe_transition(&transition),
        )));

        Ok(SyncReport {
            key,
            link,
            comment_posted,
            transition,
            annotations,
        })
    }

    /// Create the PR link unless one with the same URL is already attached.
    async fn ensure_remote_link(
        &self,
        key: &IssueKey,
        event: &PullRequestEvent,
        annotations: &mut Vec<Annotation>,
    ) -> LinkOutcome {
        let request = remote_link_request(event);

        match self.tracker.remote_links(key).await {
            Ok(links) => {
                if let Some(existing) = links.iter().find(|l| l.object.url == event.html_url) {
                    if existing.is_current(&request) {
                        info!(key = %key, link_id = existing.id, "Remote link already present");
                        return LinkOutcome::AlreadyPresent;
                    }

                    return match self
                        .tracker
                        .update_remote_link(key, existing.id, &request)
                        .await
                    {
                        Ok(()) => {
                            info!(key = %key, link_id = existing.id, "Remote link updated");
                            LinkOutcome::Updated
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "Failed to update remote link");
                            annotations
                                .push(Annotation::warning(format!("Failed to update remote link: {e}")));
                            LinkOutcome::Failed
                        }
                    };
                }
            }
            Err(e) => {
                // POST is keyed by globalId, so creating blind cannot duplicate our own link.
                warn!(key = %key, error = %e, "Failed to list remote links");
                annotations.push(Annotation::warning(format!(
                    "Failed to list remote links on {key}: {e}"
                )));
            }
        }

        match self.tracker.create_remote_link(key, &request).await {
            Ok(()) => {
                info!(key = %key, url = %event.html_url, "Remote link created");
                LinkOutcome::Created
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to create remote link");
                annotations.push(Annotation::warning(format!(
                    "Failed to create remote link: {e}"
                )));
                LinkOutcome::Failed
            }
        }
    }

    async fn post_comment(
        &self,
        key: &IssueKey,
        comment: &Comment,
        annotations: &mut Vec<Annotation>,
    ) -> bool {
        match self.tracker.add_comment(key, comment).await {
            Ok(()) => {
                info!(key = %key, "Comment posted");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to add comment");
                annotations.push(Annotation::warning(format!("Failed to add comment: {e}")));
                false
            }
        }
    }

    async fn apply_transition(
        &self,
        key: &IssueKey,
        plan: SyncPlan,
        annotations: &mut Vec<Annotation>,
    ) -> TransitionOutcome {
        let Some(target) = plan.transition() else {
            return TransitionOutcome::NotApplicable;
        };
        let configured = match target {
            TransitionTarget::InReview => self.transitions.in_review.as_deref(),
            TransitionTarget::Done => self.transitions.done.as_deref(),
        };
        let Some(wanted) = configured else {
            return TransitionOutcome::NotConfigured;
        };

        let available = match self.tracker.transitions(key).await {
            Ok(available) => available,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to get transitions");
                annotations.push(Annotation::warning(format!("Failed to get transitions: {e}")));
                return TransitionOutcome::Failed(wanted.to_string());
            }
        };

        let Some(found) = find_transition(&available, wanted) else {
            // Usually the issue is already past this step.
            info!(key = %key, wanted, "No matching transition available");
            annotations.push(Annotation::notice(format!(
                "No transition matching '{wanted}' available on {key}; skipping"
            )));
            return TransitionOutcome::NoMatch(wanted.to_string());
        };

        match self.tracker.transition(key, &found.id).await {
            Ok(()) => {
                info!(key = %key, transition = %found.name, "Transition applied");
                TransitionOutcome::Applied(found.name.clone())
            }
            Err(e) => {
                warn!(key = %key, transition = %found.name, error = %e, "Transition failed");
                annotations.push(Annotation::warning(format!(
                    "Transition '{}' failed: {e}",
                    found.name
                )));
                TransitionOutcome::Failed(found.name.clone())
            }
        }
    }
}

fn describe_link(link: LinkOutcome) -> &'static str {
    match link {
        LinkOutcome::Created => "created",
        LinkOutcome::Updated => "updated",
        LinkOutcome::AlreadyPresent => "already present",
        LinkOutcome::Failed => "failed",
    }
}

fn describe_transition(transition: &TransitionOutcome) -> String {
    match transition {
        TransitionOutcome::NotApplicable => "none".to_string(),
        TransitionOutcome::NotConfigured => "not configured".to_string(),
        TransitionOutcome::NoMatch(name) => format!("'{name}' not available"),
        TransitionOutcome::Applied(name) => format!("applied '{name}'"),
        TransitionOutcome::Failed(name) => format!("'{name}' failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JiraError;
    use crate::jira::models::{Issue, IssueFields, RemoteLink};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        GetIssue,
        RemoteLinks,
        CreateLink,
        UpdateLink(u64),
        Comment(String),
        Transitions,
        Transition(String),
    }

    /// In-memory tracker recording every call.
    #[derive(Default)]
    struct FakeTracker {
        issue_missing: bool,
        fail_links: bool,
        fail_list_links: bool,
        fail_comment: bool,
        fail_transitions: bool,
        fail_transition: bool,
        links: Mutex<Vec<RemoteLink>>,
        available: Vec<Transition>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeTracker {
        fn with_transitions(names: &[(&str, &str)]) -> Self {
            Self {
                available: names
                    .iter()
                    .map(|(id, name)| Transition {
                        id: (*id).to_string(),
                        name: (*name).to_string(),
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|&c| pred(c)).count()
        }

        fn api_error() -> JiraError {
            JiraError::Api {
                status: 500,
                message: "boom".to_string(),
            }
        }
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn get_issue(&self, key: &IssueKey) -> Result<Issue, JiraError> {
            self.record(Call::GetIssue);
            if self.issue_missing {
                return Err(JiraError::NotFound("Issue does not exist".to_string()));
            }
            Ok(Issue {
                id: "10001".to_string(),
                key: key.to_string(),
                fields: IssueFields::default(),
            })
        }

        async fn remote_links(&self, _key: &IssueKey) -> Result<Vec<RemoteLink>, JiraError> {
            self.record(Call::RemoteLinks);
            if self.fail_list_links {
                return Err(Self::api_error());
            }
            Ok(self.links.lock().unwrap().clone())
        }

        async fn create_remote_link(
            &self,
            _key: &IssueKey,
            link: &RemoteLinkRequest,
        ) -> Result<(), JiraError> {
            self.record(Call::CreateLink);
            if self.fail_links {
                return Err(Self::api_error());
            }
            let mut links = self.links.lock().unwrap();
            let id = links.len() as u64 + 1;
            links.push(RemoteLink {
                id,
                global_id: Some(link.global_id.clone()),
                object: link.object.clone(),
            });
            Ok(())
        }

        async fn update_remote_link(
            &self,
            _key: &IssueKey,
            link_id: u64,
            link: &RemoteLinkRequest,
        ) -> Result<(), JiraError> {
            self.record(Call::UpdateLink(link_id));
            let mut links = self.links.lock().unwrap();
            if let Some(existing) = links.iter_mut().find(|l| l.id == link_id) {
                existing.object = link.object.clone();
            }
            Ok(())
        }

        async fn add_comment(&self, _key: &IssueKey, comment: &Comment) -> Result<(), JiraError> {
            self.record(Call::Comment(comment.plain_text()));
            if self.fail_comment {
                return Err(Self::api_error());
            }
            Ok(())
        }

        async fn transitions(&self, _key: &IssueKey) -> Result<Vec<Transition>, JiraError> {
            self.record(Call::Transitions);
            if self.fail_transitions {
                return Err(Self::api_error());
            }
            Ok(self.available.clone())
        }

        async fn transition(&self, _key: &IssueKey, transition_id: &str) -> Result<(), JiraError> {
            self.record(Call::Transition(transition_id.to_string()));
            if self.fail_transition {
                return Err(Self::api_error());
            }
            Ok(())
        }
    }

    fn event(action: PrAction, merged: bool) -> PullRequestEvent {
        let closed = action == PrAction::Closed;
        PullRequestEvent {
            action,
            number: 7,
            title: "Fix login".to_string(),
            body: String::new(),
            head_ref: "feature/SECO-42-fix".to_string(),
            base_ref: "main".to_string(),
            state: if closed { PrState::Closed } else { PrState::Open },
            merged,
            html_url: "https://github.com/acme/app/pull/7".to_string(),
            user: "alice".to_string(),
            sender: Some("bob".to_string()),
            created_at: None,
            merged_at: None,
            closed_at: None,
            merge_commit_sha: merged.then(|| "deadbeefcafe".to_string()),
        }
    }

    fn transitions() -> TransitionConfig {
        TransitionConfig {
            in_review: Some("In Review".to_string()),
            done: Some("done".to_string()),
        }
    }

    fn engine(tracker: FakeTracker, transitions: TransitionConfig) -> SyncEngine<FakeTracker> {
        SyncEngine::new(tracker, KeyExtractor::default(), transitions)
    }

    fn report(outcome: SyncOutcome) -> SyncReport {
        match outcome {
            SyncOutcome::Completed(report) => report,
            SyncOutcome::Skipped(reason) => panic!("unexpected skip: {reason:?}"),
        }
    }

    #[tokio::test]
    async fn test_opened_links_comments_and_transitions() {
        let tracker = FakeTracker::with_transitions(&[("11", "To Do"), ("21", "In Review")]);
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Opened, false)).await.unwrap());

        assert_eq!(report.key.as_str(), "SECO-42");
        assert_eq!(report.link, LinkOutcome::Created);
        assert!(report.comment_posted);
        assert_eq!(report.transition, TransitionOutcome::Applied("In Review".to_string()));
        assert!(!report.has_warnings());

        let calls = engine.tracker().calls();
        assert_eq!(calls[0], Call::GetIssue);
        assert!(calls.contains(&Call::Transition("21".to_string())));
        let Some(Call::Comment(text)) = calls.iter().find(|c| matches!(c, Call::Comment(_))) else {
            panic!("no comment posted");
        };
        assert!(text.contains("opened by @bob"));
        assert!(text.contains("https://github.com/acme/app/pull/7"));
    }

    #[tokio::test]
    async fn test_synchronize_comment_says_updated() {
        let engine = engine(FakeTracker::default(), TransitionConfig::default());
        let report = report(engine.run(&event(PrAction::Synchronize, false)).await.unwrap());
        assert_eq!(report.transition, TransitionOutcome::NotConfigured);
        let calls = engine.tracker().calls();
        assert!(calls
            .iter()
            .any(|c| matches!(c, Call::Comment(t) if t.contains("updated by @bob"))));
        assert_eq!(engine.tracker().count(|c| *c == Call::Transitions), 0);
    }

    #[tokio::test]
    async fn test_merged_posts_one_comment_with_sha_and_done_transition() {
        let tracker = FakeTracker::with_transitions(&[("31", "Done")]);
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Closed, true)).await.unwrap());

        assert_eq!(report.transition, TransitionOutcome::Applied("Done".to_string()));
        let tracker = engine.tracker();
        assert_eq!(tracker.count(|c| matches!(c, Call::Comment(_))), 1);
        assert_eq!(
            tracker.count(|c| matches!(c, Call::Comment(t) if t.contains("deadbeefcafe"))),
            1
        );
        assert!(tracker.calls().contains(&Call::Transition("31".to_string())));
    }

    #[tokio::test]
    async fn test_closed_without_merge_never_transitions() {
        let tracker = FakeTracker::with_transitions(&[("31", "Done")]);
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Closed, false)).await.unwrap());

        assert_eq!(report.transition, TransitionOutcome::NotApplicable);
        let tracker = engine.tracker();
        assert_eq!(tracker.count(|c| *c == Call::Transitions), 0);
        assert_eq!(tracker.count(|c| matches!(c, Call::Transition(_))), 0);
        assert!(tracker
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Comment(t) if t.contains("closed without merge"))));
    }

    #[tokio::test]
    async fn test_no_key_is_a_soft_skip() {
        let engine = engine(FakeTracker::default(), transitions());
        let mut ev = event(PrAction::Opened, false);
        ev.head_ref = "main".to_string();
        ev.title = "Unrelated".to_string();

        let outcome = engine.run(&ev).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::NoKey));
        assert_eq!(outcome.annotations()[0].level, AnnotationLevel::Notice);
        assert!(engine.tracker().calls().is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_action_is_a_soft_skip() {
        let engine = engine(FakeTracker::default(), transitions());
        let outcome = engine
            .run(&event(PrAction::Other("labeled".to_string()), false))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Skipped(SkipReason::UnhandledAction("labeled".to_string()))
        );
        assert!(engine.tracker().calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_issue_fails_before_any_mutation() {
        let tracker = FakeTracker {
            issue_missing: true,
            ..FakeTracker::with_transitions(&[("31", "Done")])
        };
        let engine = engine(tracker, transitions());

        let err = engine.run(&event(PrAction::Closed, true)).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::IssueUnavailable {
                source: JiraError::NotFound(_),
                ..
            }
        ));
        assert_eq!(engine.tracker().calls(), vec![Call::GetIssue]);
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let engine = engine(FakeTracker::default(), TransitionConfig::default());
        let ev = event(PrAction::Opened, false);

        let first = report(engine.run(&ev).await.unwrap());
        let second = report(engine.run(&ev).await.unwrap());

        assert_eq!(first.link, LinkOutcome::Created);
        assert_eq!(second.link, LinkOutcome::AlreadyPresent);
        assert_eq!(engine.tracker().links.lock().unwrap().len(), 1);
        assert_eq!(engine.tracker().count(|c| *c == Call::CreateLink), 1);
    }

    #[tokio::test]
    async fn test_stale_link_is_updated_in_place() {
        let engine = engine(FakeTracker::default(), TransitionConfig::default());

        report(engine.run(&event(PrAction::Opened, false)).await.unwrap());
        let merged = report(engine.run(&event(PrAction::Closed, true)).await.unwrap());

        assert_eq!(merged.link, LinkOutcome::Updated);
        let links = engine.tracker().links.lock().unwrap().clone();
        assert_eq!(links.len(), 1);
        let status = links[0].object.status.clone().unwrap();
        assert!(status.resolved);
        assert_eq!(status.icon.unwrap().title.as_deref(), Some("Merged"));
        assert!(engine.tracker().calls().contains(&Call::UpdateLink(1)));
    }

    #[tokio::test]
    async fn test_step_failures_are_warnings_and_do_not_abort() {
        let tracker = FakeTracker {
            fail_links: true,
            fail_comment: true,
            ..FakeTracker::with_transitions(&[("21", "In Review")])
        };
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Opened, false)).await.unwrap());

        assert_eq!(report.link, LinkOutcome::Failed);
        assert!(!report.comment_posted);
        assert_eq!(report.transition, TransitionOutcome::Applied("In Review".to_string()));
        assert!(report.has_warnings());
        let warnings = report
            .annotations
            .iter()
            .filter(|a| a.level == AnnotationLevel::Warning)
            .count();
        assert_eq!(warnings, 2);
    }

    fn warnings(report: &SyncReport) -> Vec<&str> {
        report
            .annotations
            .iter()
            .filter(|a| a.level == AnnotationLevel::Warning)
            .map(|a| a.message.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_link_listing_failure_still_creates() {
        let tracker = FakeTracker {
            fail_list_links: true,
            ..FakeTracker::default()
        };
        let engine = engine(tracker, TransitionConfig::default());

        let report = report(engine.run(&event(PrAction::Opened, false)).await.unwrap());

        assert_eq!(report.link, LinkOutcome::Created);
        assert!(report.comment_posted);
        assert_eq!(engine.tracker().count(|c| *c == Call::CreateLink), 1);
        assert!(report.has_warnings());
        let warnings = warnings(&report);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Failed to list remote links on SECO-42"));
    }

    #[tokio::test]
    async fn test_transition_failure_is_a_warning() {
        let tracker = FakeTracker {
            fail_transition: true,
            ..FakeTracker::with_transitions(&[("31", "Done")])
        };
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Closed, true)).await.unwrap());

        assert_eq!(report.link, LinkOutcome::Created);
        assert!(report.comment_posted);
        assert_eq!(report.transition, TransitionOutcome::Failed("Done".to_string()));
        assert_eq!(
            engine.tracker().count(|c| *c == Call::Transition("31".to_string())),
            1
        );
        assert!(report.has_warnings());
        assert_eq!(warnings(&report), vec!["Transition 'Done' failed: Jira API error: 500 - boom"]);
    }

    #[tokio::test]
    async fn test_transition_listing_failure_is_a_warning() {
        let tracker = FakeTracker {
            fail_transitions: true,
            ..FakeTracker::with_transitions(&[("21", "In Review")])
        };
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Opened, false)).await.unwrap());

        assert_eq!(report.transition, TransitionOutcome::Failed("In Review".to_string()));
        assert_eq!(
            engine.tracker().count(|c| matches!(c, Call::Transition(_))),
            0
        );
        assert!(report.has_warnings());
        assert_eq!(warnings(&report).len(), 1);
    }

    #[test]
    fn test_prepare_decides_without_tracker() {
        let extractor = KeyExtractor::default();

        let prepared = prepare(&extractor, &event(PrAction::Opened, false)).unwrap();
        assert_eq!(prepared.key.as_str(), "SECO-42");

        let mut no_key = event(PrAction::Opened, false);
        no_key.head_ref = "main".to_string();
        assert_eq!(prepare(&extractor, &no_key), Err(SkipReason::NoKey));

        let labeled = event(PrAction::Other("labeled".to_string()), false);
        assert_eq!(
            prepare(&extractor, &labeled),
            Err(SkipReason::UnhandledAction("labeled".to_string()))
        );
    }

    #[test]
    fn test_has_warnings_ignores_notices() {
        let report = SyncReport {
            key: prepare(&KeyExtractor::default(), &event(PrAction::Opened, false))
                .unwrap()
                .key,
            link: LinkOutcome::AlreadyPresent,
            comment_posted: true,
            transition: TransitionOutcome::NoMatch("Done".to_string()),
            annotations: vec![Annotation::notice("No transition matching 'Done'")],
        };
        assert!(!report.has_warnings());
    }

    #[tokio::test]
    async fn test_unmatched_transition_is_a_notice() {
        let tracker = FakeTracker::with_transitions(&[("11", "To Do")]);
        let engine = engine(tracker, transitions());

        let report = report(engine.run(&event(PrAction::Opened, false)).await.unwrap());

        assert_eq!(report.transition, TransitionOutcome::NoMatch("In Review".to_string()));
        assert!(!report.has_warnings());
        assert_eq!(engine.tracker().count(|c| matches!(c, Call::Transition(_))), 0);
    }

    #[test]
    fn test_find_transition_by_id_or_name() {
        let available = vec![
            Transition {
                id: "21".to_string(),
                name: "In Review".to_string(),
            },
            Transition {
                id: "31".to_string(),
                name: "Done".to_string(),
            },
        ];
        assert_eq!(find_transition(&available, "31").unwrap().name, "Done");
        assert_eq!(find_transition(&available, "in review").unwrap().id, "21");
        assert_eq!(find_transition(&available, " DONE ").unwrap().id, "31");
        assert!(find_transition(&available, "Closed").is_none());
    }

    #[test]
    fn test_link_status_label() {
        assert_eq!(link_status_label(PrState::Closed, true), "Merged");
        assert_eq!(link_status_label(PrState::Open, false), "Open");
        assert_eq!(link_status_label(PrState::Closed, false), "Closed");
    }

    #[test]
    fn test_remote_link_request_shape() {
        let request = remote_link_request(&event(PrAction::Closed, true));
        assert_eq!(request.global_id, "https://github.com/acme/app/pull/7");
        assert_eq!(request.object.title, "PR #7: Fix login");
        assert_eq!(request.object.summary.as_deref(), Some("feature/SECO-42-fix → main"));
        let status = request.object.status.unwrap();
        assert!(status.resolved);
        assert_eq!(status.icon.unwrap().title.as_deref(), Some("Merged"));

        let open = remote_link_request(&event(PrAction::Opened, false));
        assert!(!open.object.status.unwrap().resolved);
    }
}
