//! In-memory issue tracker.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

use super::{CloseReason, Issue, IssueQuery, IssueState, IssueTracker, NewIssue, PullRequestInfo};

#[derive(Debug, Default)]
struct State {
    issues: Vec<Issue>,
    next_number: u64,
    pull_requests: HashMap<u64, (PullRequestInfo, Vec<String>)>,
    issue_comments: Vec<(u64, String)>,
    pr_comments: Vec<(u64, String)>,
    closures: Vec<(u64, CloseReason)>,
    /// Actor node id to login.
    actors: HashMap<String, String>,
}

impl State {
    fn issue_mut(&mut self, number: u64) -> Result<&mut Issue> {
        self.issues
            .iter_mut()
            .find(|issue| issue.number == number)
            .ok_or_else(|| Error::GitHub(format!("issue #{} not found", number)))
    }

    fn insert(&mut self, issue: &NewIssue, state: IssueState) -> Issue {
        self.next_number += 1;
        let number = self.next_number;
        let issue = Issue {
            number,
            node_id: format!("I_mem{}", number),
            title: issue.title.clone(),
            body: issue.body.clone(),
            state,
            labels: issue.labels.clone(),
            assignees: Vec::new(),
        };
        self.issues.push(issue.clone());
        issue
    }
}

/// Issue tracker that keeps all state in memory.
///
/// Issues are numbered from 1 in creation order. Comments, closures and
/// assignments are recorded and can be inspected afterwards.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    state: Mutex<State>,
}

impl MemoryTracker {
    /// Creates an empty tracker with no actors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an assignable actor.
    pub fn with_actor(mut self, login: impl Into<String>, id: impl Into<String>) -> Self {
        self.state.get_mut().actors.insert(id.into(), login.into());
        self
    }

    /// Seeds an issue in the given state.
    pub fn with_issue(mut self, issue: NewIssue, state: IssueState) -> Self {
        self.state.get_mut().insert(&issue, state);
        self
    }

    /// Seeds a pull request and the files it changes.
    pub fn with_pull_request(mut self, pr: PullRequestInfo, files: Vec<String>) -> Self {
        self.state
            .get_mut()
            .pull_requests
            .insert(pr.number, (pr, files));
        self
    }

    /// Returns every issue in creation order.
    pub async fn issues(&self) -> Vec<Issue> {
        self.state.lock().await.issues.clone()
    }

    /// Returns the comments posted on an issue.
    pub async fn issue_comments(&self, number: u64) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .issue_comments
            .iter()
            .filter(|(n, _)| *n == number)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Returns the comments posted on a pull request.
    pub async fn pull_request_comments(&self, number: u64) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .pr_comments
            .iter()
            .filter(|(n, _)| *n == number)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Returns the reason an issue was closed through the tracker.
    pub async fn close_reason(&self, number: u64) -> Option<CloseReason> {
        let state = self.state.lock().await;
        state
            .closures
            .iter()
            .rev()
            .find(|(n, _)| *n == number)
            .map(|(_, reason)| *reason)
    }
}

#[async_trait]
impl IssueTracker for MemoryTracker {
    async fn view_issue(&self, number: u64) -> Result<Issue> {
        let mut state = self.state.lock().await;
        state.issue_mut(number).map(|issue| issue.clone())
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let state = self.state.lock().await;
        Ok(state
            .issues
            .iter()
            .filter(|issue| query.state.matches(issue.state))
            .filter(|issue| query.label.as_deref().map_or(true, |l| issue.has_label(l)))
            .cloned()
            .collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let mut state = self.state.lock().await;
        let created = state.insert(issue, IssueState::Open);
        tracing::info!(issue = created.number, title = %created.title, "created issue (in memory)");
        Ok(created)
    }

    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.issue_mut(number)?;
        state.issue_comments.push((number, body.to_string()));
        Ok(())
    }

    async fn close_issue(&self, number: u64, reason: CloseReason, comment: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.issue_mut(number)?.state = IssueState::Closed;
        state.issue_comments.push((number, comment.to_string()));
        state.closures.push((number, reason));
        Ok(())
    }

    async fn view_pull_request(&self, number: u64) -> Result<PullRequestInfo> {
        let state = self.state.lock().await;
        state
            .pull_requests
            .get(&number)
            .map(|(pr, _)| pr.clone())
            .ok_or_else(|| Error::GitHub(format!("pull request #{} not found", number)))
    }

    async fn pull_request_files(&self, number: u64) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        state
            .pull_requests
            .get(&number)
            .map(|(_, files)| files.clone())
            .ok_or_else(|| Error::GitHub(format!("pull request #{} not found", number)))
    }

    async fn comment_on_pull_request(&self, number: u64, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.pull_requests.contains_key(&number) {
            return Err(Error::GitHub(format!("pull request #{} not found", number)));
        }
        state.pr_comments.push((number, body.to_string()));
        Ok(())
    }

    async fn resolve_actor_id(&self, login: &str) -> Result<Option<String>> {
        let state = self.state.lock().await;
        Ok(state
            .actors
            .iter()
            .find(|(_, l)| l.as_str() == login)
            .map(|(id, _)| id.clone()))
    }

    async fn assign_actor(&self, number: u64, actor_id: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        let login = state
            .actors
            .get(actor_id)
            .cloned()
            .ok_or_else(|| Error::GitHub(format!("unknown actor id {}", actor_id)))?;

        let issue = state.issue_mut(number)?;
        issue.assignees = vec![login];
        Ok(issue.assignees.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
