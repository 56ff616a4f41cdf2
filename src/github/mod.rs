//! Issue tracker seam.
//!
//! Workflows talk to GitHub only through [`IssueTracker`]. [`GhClient`] drives
//! the `gh` CLI; [`MemoryTracker`] keeps everything in memory for dry runs and
//! tests.

mod gh;
mod memory;

pub use gh::GhClient;
pub use memory::MemoryTracker;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueState {
    /// Accepting work.
    Open,
    /// Completed or dismissed.
    Closed,
}

/// An issue as seen by the workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number within the repository.
    pub number: u64,
    /// GraphQL node id.
    pub node_id: String,
    /// Issue title.
    pub title: String,
    /// Markdown body.
    pub body: String,
    /// Open or closed.
    pub state: IssueState,
    /// Label names.
    pub labels: Vec<String>,
    /// Assignee logins.
    pub assignees: Vec<String>,
}

impl Issue {
    /// Returns true if the issue carries the label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// State filter for issue listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFilter {
    /// Open issues only.
    #[default]
    Open,
    /// Closed issues only.
    Closed,
    /// Every issue.
    All,
}

impl StateFilter {
    /// Returns the `gh --state` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }

    /// Returns true if an issue in `state` passes the filter.
    pub fn matches(&self, state: IssueState) -> bool {
        match self {
            StateFilter::Open => state == IssueState::Open,
            StateFilter::Closed => state == IssueState::Closed,
            StateFilter::All => true,
        }
    }
}

/// Issue listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    /// Which issue states to include.
    pub state: StateFilter,
    /// Only issues carrying this label, if set.
    pub label: Option<String>,
}

impl IssueQuery {
    /// Creates a query for issues in the given state.
    pub fn new(state: StateFilter) -> Self {
        Self { state, label: None }
    }

    /// Restricts the query to issues carrying `label`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An issue to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    /// Issue title.
    pub title: String,
    /// Markdown body.
    pub body: String,
    /// Labels applied at creation.
    pub labels: Vec<String>,
}

impl NewIssue {
    /// Creates an unlabelled issue.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            labels: Vec::new(),
        }
    }

    /// Sets the labels to apply.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }
}

/// Why an issue was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The work was done.
    Completed,
    /// The issue was abandoned or replaced.
    NotPlanned,
}

impl CloseReason {
    /// Returns the `gh issue close --reason` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Completed => "completed",
            CloseReason::NotPlanned => "not planned",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of a pull request the workflows inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    /// Pull request number.
    pub number: u64,
    /// PR title.
    pub title: String,
    /// PR description.
    pub body: String,
    /// Issues linked through closing keywords.
    pub closing_issues: Vec<u64>,
}

/// Operations the workflows need from an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetches one issue.
    async fn view_issue(&self, number: u64) -> Result<Issue>;

    /// Lists issues matching the query.
    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>>;

    /// Creates an issue and returns it.
    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue>;

    /// Posts a comment on an issue.
    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<()>;

    /// Closes an issue with a reason and a comment.
    async fn close_issue(&self, number: u64, reason: CloseReason, comment: &str) -> Result<()>;

    /// Fetches a pull request.
    async fn view_pull_request(&self, number: u64) -> Result<PullRequestInfo>;

    /// Lists the paths a pull request changes.
    async fn pull_request_files(&self, number: u64) -> Result<Vec<String>>;

    /// Posts a comment on a pull request.
    async fn comment_on_pull_request(&self, number: u64, body: &str) -> Result<()>;

    /// Looks up the node id of an assignable actor by login.
    async fn resolve_actor_id(&self, login: &str) -> Result<Option<String>>;

    /// Replaces an issue's assignees with the actor, returning the new assignee logins.
    async fn assign_actor(&self, number: u64, actor_id: &str) -> Result<Vec<String>>;

    /// Returns the name of this tracker.
    fn name(&self) -> &str;
}

/// Resolves `login` and assigns it to the issue.
///
/// Returns `Ok(false)` when the actor cannot be found.
pub async fn assign_login(tracker: &dyn IssueTracker, number: u64, login: &str) -> Result<bool> {
    let Some(actor_id) = tracker.resolve_actor_id(login).await? else {
        tracing::warn!(login = %login, "actor not found among assignable actors");
        return Ok(false);
    };

    let assignees = tracker.assign_actor(number, &actor_id).await?;
    let assigned = assignees.iter().any(|a| a == login);
    tracing::info!(issue = number, assignees = ?assignees, "assigned issue");
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_filter_matches() {
        assert!(StateFilter::Open.matches(IssueState::Open));
        assert!(!StateFilter::Open.matches(IssueState::Closed));
        assert!(StateFilter::Closed.matches(IssueState::Closed));
        assert!(StateFilter::All.matches(IssueState::Open));
        assert_eq!(StateFilter::default(), StateFilter::Open);
    }

    #[test]
    fn issue_query_builder() {
        let query = IssueQuery::new(StateFilter::Closed).with_label("game-rfc");
        assert_eq!(query.state.as_str(), "closed");
        assert_eq!(query.label.as_deref(), Some("game-rfc"));
    }

    #[test]
    fn issue_state_deserializes_from_gh() {
        let state: IssueState = serde_json::from_str("\"OPEN\"").unwrap();
        assert_eq!(state, IssueState::Open);
    }

    #[test]
    fn close_reason_strings() {
        assert_eq!(CloseReason::NotPlanned.to_string(), "not planned");
        assert_eq!(CloseReason::Completed.as_str(), "completed");
    }

    #[tokio::test]
    async fn assign_login_reports_unknown_actor() {
        let tracker = MemoryTracker::new();
        let issue = tracker.create_issue(&NewIssue::new("t", "b")).await.unwrap();
        assert!(!assign_login(&tracker, issue.number, "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn assign_login_assigns_known_actor() {
        let tracker = MemoryTracker::new().with_actor("bot", "BOT_1");
        let issue = tracker.create_issue(&NewIssue::new("t", "b")).await.unwrap();
        assert!(assign_login(&tracker, issue.number, "bot").await.unwrap());
        assert_eq!(
            tracker.view_issue(issue.number).await.unwrap().assignees,
            vec!["bot"]
        );
    }
}
