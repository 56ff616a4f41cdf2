//! `gh` CLI backed issue tracker.

use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

use super::{CloseReason, Issue, IssueQuery, IssueState, IssueTracker, NewIssue, PullRequestInfo};

const ISSUE_FIELDS: &str = "number,id,title,body,state,labels,assignees";
const PULL_REQUEST_FIELDS: &str = "number,title,body,closingIssuesReferences";
const LIST_LIMIT: &str = "1000";

const SUGGESTED_ACTORS_QUERY: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    suggestedActors(capabilities: [CAN_BE_ASSIGNED], first: 100) {
      nodes {
        login
        ... on Bot { id }
        ... on User { id }
      }
    }
  }
}
"#;

const REPLACE_ACTORS_MUTATION: &str = r#"
mutation($assignableId: ID!, $actorIds: [ID!]!) {
  replaceActorsForAssignable(input: { assignableId: $assignableId, actorIds: $actorIds }) {
    assignable {
      ... on Issue {
        number
        assignees(first: 10) { nodes { login } }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: u64,
    id: String,
    title: String,
    #[serde(default)]
    body: String,
    state: IssueState,
    #[serde(default)]
    labels: Vec<GhLabel>,
    #[serde(default)]
    assignees: Vec<GhUser>,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    closing_issues_references: Vec<GhNumber>,
}

#[derive(Debug, Deserialize)]
struct GhFiles {
    #[serde(default)]
    files: Vec<GhFile>,
}

#[derive(Debug, Deserialize)]
struct GhFile {
    path: String,
}

#[derive(Debug, Deserialize)]
struct GhRepo {
    name: String,
    owner: GhUser,
}

impl From<GhIssue> for Issue {
    fn from(raw: GhIssue) -> Self {
        Self {
            number: raw.number,
            node_id: raw.id,
            title: raw.title,
            body: raw.body,
            state: raw.state,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            assignees: raw.assignees.into_iter().map(|a| a.login).collect(),
        }
    }
}

impl From<GhPullRequest> for PullRequestInfo {
    fn from(raw: GhPullRequest) -> Self {
        Self {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            closing_issues: raw
                .closing_issues_references
                .into_iter()
                .map(|r| r.number)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedActorsData {
    repository: SuggestedActorsRepository,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedActorsRepository {
    suggested_actors: Nodes<Actor>,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceActorsData {
    replace_actors_for_assignable: ReplaceActorsPayload,
}

#[derive(Debug, Deserialize)]
struct ReplaceActorsPayload {
    assignable: Assignable,
}

#[derive(Debug, Deserialize)]
struct Assignable {
    assignees: Nodes<GhUser>,
}

/// Issue tracker that shells out to the GitHub CLI.
pub struct GhClient {
    /// Repository in `owner/name` form; `gh` infers it when unset.
    repo: Option<String>,
    /// Path to the gh CLI binary.
    cli_path: String,
}

impl GhClient {
    /// Creates a client for a repository using the default `gh` command.
    pub fn new(repo: Option<String>) -> Self {
        Self {
            repo,
            cli_path: "gh".to_string(),
        }
    }

    /// Sets a custom CLI path.
    pub fn with_cli_path(mut self, cli_path: impl Into<String>) -> Self {
        self.cli_path = cli_path.into();
        self
    }

    fn repo_args(&self, args: &mut Vec<String>) {
        if let Some(repo) = &self.repo {
            args.push("--repo".to_string());
            args.push(repo.clone());
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>> {
        tracing::debug!(cli = %self.cli_path, args = ?args, "running gh");

        let output = Command::new(&self.cli_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::GitHub(format!("failed to run {}: {}", self.cli_path, e)))?;

        if !output.status.success() {
            return Err(Error::GitHub(format!(
                "{} {} failed: {}",
                self.cli_path,
                args.first().map(String::as_str).unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }

    async fn run_json<T: DeserializeOwned>(&self, args: Vec<String>) -> Result<T> {
        let stdout = self.run(args).await?;
        decode(&stdout)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::to_vec(&json!({ "query": query, "variables": variables }))?;

        let mut child = Command::new(&self.cli_path)
            .args(["api", "graphql", "--input", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::GitHub(format!("failed to run {}: {}", self.cli_path, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::GitHub(format!(
                "graphql request failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let response: GraphQlResponse<T> = decode(&output.stdout)?;
        graphql_data(response)
    }

    async fn repo_coordinates(&self) -> Result<(String, String)> {
        if let Some(repo) = &self.repo {
            return split_repo(repo);
        }

        let raw: GhRepo = self
            .run_json(vec![
                "repo".to_string(),
                "view".to_string(),
                "--json".to_string(),
                "name,owner".to_string(),
            ])
            .await?;
        Ok((raw.owner.login, raw.name))
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::GitHub(format!("unexpected gh output: {}", e)))
}

fn graphql_data<T>(response: GraphQlResponse<T>) -> Result<T> {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(Error::GitHub(format!("graphql errors: {}", messages.join("; "))));
    }
    response
        .data
        .ok_or_else(|| Error::GitHub("graphql response has no data".to_string()))
}

fn split_repo(repo: &str) -> Result<(String, String)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(Error::Config(format!(
            "repo '{}' must be in owner/name form",
            repo
        ))),
    }
}

/// Extracts the issue number from the URL printed by `gh issue create`.
fn parse_issue_url(stdout: &str) -> Result<u64> {
    stdout
        .trim()
        .rsplit('/')
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| Error::GitHub(format!("could not parse issue URL: {}", stdout.trim())))
}

fn find_actor(actors: Vec<Actor>, login: &str) -> Option<String> {
    actors
        .into_iter()
        .find(|actor| actor.login == login)
        .and_then(|actor| actor.id)
}

#[async_trait]
impl IssueTracker for GhClient {
    async fn view_issue(&self, number: u64) -> Result<Issue> {
        let mut args = vec!["issue".to_string(), "view".to_string(), number.to_string()];
        self.repo_args(&mut args);
        args.extend(["--json".to_string(), ISSUE_FIELDS.to_string()]);

        let raw: GhIssue = self.run_json(args).await?;
        Ok(raw.into())
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let mut args = vec![
            "issue".to_string(),
            "list".to_string(),
            "--state".to_string(),
            query.state.as_str().to_string(),
            "--limit".to_string(),
            LIST_LIMIT.to_string(),
        ];
        self.repo_args(&mut args);
        if let Some(label) = &query.label {
            args.extend(["--label".to_string(), label.clone()]);
        }
        args.extend(["--json".to_string(), ISSUE_FIELDS.to_string()]);

        let raw: Vec<GhIssue> = self.run_json(args).await?;
        Ok(raw.into_iter().map(Issue::from).collect())
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let mut args = vec![
            "issue".to_string(),
            "create".to_string(),
            "--title".to_string(),
            issue.title.clone(),
            "--body".to_string(),
            issue.body.clone(),
        ];
        self.repo_args(&mut args);
        for label in &issue.labels {
            args.extend(["--label".to_string(), label.clone()]);
        }

        let stdout = self.run(args).await?;
        let number = parse_issue_url(&String::from_utf8_lossy(&stdout))?;
        tracing::info!(issue = number, title = %issue.title, "created issue");

        self.view_issue(number).await
    }

    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<()> {
        let mut args = vec![
            "issue".to_string(),
            "comment".to_string(),
            number.to_string(),
            "--body".to_string(),
            body.to_string(),
        ];
        self.repo_args(&mut args);
        self.run(args).await?;
        Ok(())
    }

    async fn close_issue(&self, number: u64, reason: CloseReason, comment: &str) -> Result<()> {
        let mut args = vec![
            "issue".to_string(),
            "close".to_string(),
            number.to_string(),
            "--reason".to_string(),
            reason.as_str().to_string(),
            "--comment".to_string(),
            comment.to_string(),
        ];
        self.repo_args(&mut args);
        self.run(args).await?;
        tracing::info!(issue = number, reason = %reason, "closed issue");
        Ok(())
    }

    async fn view_pull_request(&self, number: u64) -> Result<PullRequestInfo> {
        let mut args = vec!["pr".to_string(), "view".to_string(), number.to_string()];
        self.repo_args(&mut args);
        args.extend(["--json".to_string(), PULL_REQUEST_FIELDS.to_string()]);

        let raw: GhPullRequest = self.run_json(args).await?;
        Ok(raw.into())
    }

    async fn pull_request_files(&self, number: u64) -> Result<Vec<String>> {
        let mut args = vec!["pr".to_string(), "view".to_string(), number.to_string()];
        self.repo_args(&mut args);
        args.extend(["--json".to_string(), "files".to_string()]);

        let raw: GhFiles = self.run_json(args).await?;
        Ok(raw.files.into_iter().map(|f| f.path).collect())
    }

    async fn comment_on_pull_request(&self, number: u64, body: &str) -> Result<()> {
        let mut args = vec![
            "pr".to_string(),
            "comment".to_string(),
            number.to_string(),
            "--body".to_string(),
            body.to_string(),
        ];
        self.repo_args(&mut args);
        self.run(args).await?;
        Ok(())
    }

    async fn resolve_actor_id(&self, login: &str) -> Result<Option<String>> {
        let (owner, name) = self.repo_coordinates().await?;
        let data: SuggestedActorsData = self
            .graphql(
                SUGGESTED_ACTORS_QUERY,
                json!({ "owner": owner, "name": name }),
            )
            .await?;

        let id = find_actor(data.repository.suggested_actors.nodes, login);
        tracing::debug!(login = %login, found = id.is_some(), "resolved actor");
        Ok(id)
    }

    async fn assign_actor(&self, number: u64, actor_id: &str) -> Result<Vec<String>> {
        let issue = self.view_issue(number).await?;
        let data: ReplaceActorsData = self
            .graphql(
                REPLACE_ACTORS_MUTATION,
                json!({ "assignableId": issue.node_id, "actorIds": [actor_id] }),
            )
            .await?;

        Ok(data
            .replace_actors_for_assignable
            .assignable
            .assignees
            .nodes
            .into_iter()
            .map(|u| u.login)
            .collect())
    }

    fn name(&self) -> &str {
        "gh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gh_issue_converts_labels_and_assignees() {
        let json = r#"{
            "number": 12,
            "id": "I_kwDO123",
            "title": "Game-RFC-004-1: Create Brick Model",
            "body": "body",
            "state": "OPEN",
            "labels": [{"id": "L1", "name": "micro-issue", "color": "fff"}],
            "assignees": [{"id": "U1", "login": "copilot-swe-agent", "name": ""}]
        }"#;
        let issue: Issue = decode::<GhIssue>(json.as_bytes()).unwrap().into();
        assert_eq!(issue.number, 12);
        assert_eq!(issue.node_id, "I_kwDO123");
        assert_eq!(issue.state, IssueState::Open);
        assert_eq!(issue.labels, vec!["micro-issue"]);
        assert_eq!(issue.assignees, vec!["copilot-swe-agent"]);
    }

    #[test]
    fn gh_issue_tolerates_missing_optional_fields() {
        let json = r#"{"number": 3, "id": "I_3", "title": "t", "state": "CLOSED"}"#;
        let issue: Issue = decode::<GhIssue>(json.as_bytes()).unwrap().into();
        assert_eq!(issue.state, IssueState::Closed);
        assert!(issue.body.is_empty());
        assert!(issue.labels.is_empty());
    }

    #[test]
    fn gh_pull_request_collects_closing_issues() {
        let json = r#"{
            "number": 40,
            "title": "Implement Game-RFC-004-1",
            "body": "Fixes #12",
            "closingIssuesReferences": [{"number": 12, "id": "I_12", "url": "u"}]
        }"#;
        let pr: PullRequestInfo = decode::<GhPullRequest>(json.as_bytes()).unwrap().into();
        assert_eq!(pr.number, 40);
        assert_eq!(pr.closing_issues, vec![12]);
    }

    #[test]
    fn gh_files_extracts_paths() {
        let json = r#"{"files": [{"path": "README.md", "additions": 3, "deletions": 0}]}"#;
        let files: GhFiles = decode(json.as_bytes()).unwrap();
        assert_eq!(files.files[0].path, "README.md");
    }

    #[test]
    fn undecodable_output_is_github_error() {
        assert!(matches!(decode::<GhIssue>(b"not json"), Err(Error::GitHub(_))));
    }

    #[test]
    fn parse_issue_url_takes_last_segment() {
        assert_eq!(
            parse_issue_url("https://github.com/octo/breakout/issues/57\n").unwrap(),
            57
        );
        assert!(parse_issue_url("").is_err());
    }

    #[test]
    fn split_repo_requires_owner_and_name() {
        assert_eq!(
            split_repo("octo/breakout").unwrap(),
            ("octo".to_string(), "breakout".to_string())
        );
        assert!(split_repo("breakout").is_err());
        assert!(split_repo("/breakout").is_err());
    }

    #[test]
    fn suggested_actors_response_finds_bot() {
        let json = r#"{"data": {"repository": {"suggestedActors": {"nodes": [
            {"login": "octocat", "id": "U_1"},
            {"login": "copilot-swe-agent", "id": "BOT_1"}
        ]}}}}"#;
        let response: GraphQlResponse<SuggestedActorsData> = decode(json.as_bytes()).unwrap();
        let data = graphql_data(response).unwrap();
        assert_eq!(
            find_actor(data.repository.suggested_actors.nodes, "copilot-swe-agent"),
            Some("BOT_1".to_string())
        );
    }

    #[test]
    fn replace_actors_response_lists_assignees() {
        let json = r#"{"data": {"replaceActorsForAssignable": {"assignable": {
            "number": 12, "assignees": {"nodes": [{"login": "copilot-swe-agent"}]}
        }}}}"#;
        let response: GraphQlResponse<ReplaceActorsData> = decode(json.as_bytes()).unwrap();
        let data = graphql_data(response).unwrap();
        assert_eq!(
            data.replace_actors_for_assignable.assignable.assignees.nodes[0].login,
            "copilot-swe-agent"
        );
    }

    #[test]
    fn graphql_errors_are_reported() {
        let json = r#"{"data": null, "errors": [{"message": "Could not resolve to a node"}]}"#;
        let response: GraphQlResponse<ReplaceActorsData> = decode(json.as_bytes()).unwrap();
        let err = graphql_data(response).unwrap_err();
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[test]
    fn client_builder() {
        let client = GhClient::new(Some("octo/breakout".to_string())).with_cli_path("/usr/bin/gh");
        assert_eq!(client.cli_path, "/usr/bin/gh");
        assert_eq!(client.name(), "gh");

        let mut args = Vec::new();
        client.repo_args(&mut args);
        assert_eq!(args, vec!["--repo", "octo/breakout"]);
    }
}
