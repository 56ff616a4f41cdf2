//! Pull request eligibility checks for auto-merge.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::config::{AutomationConfig, FileRule};
use crate::error::Result;
use crate::github::{IssueQuery, IssueTracker, PullRequestInfo, StateFilter};

use super::{family_regex, mentions_id};

const UNKNOWN_ISSUE_SUGGESTION: &str = "Fixes #<issue-number>";

/// Auto-merge decision for a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum PrVerdict {
    /// The PR may be auto-merged.
    Approved(String),
    /// The PR breaks a rule.
    Rejected(String),
    /// The PR is not an RFC PR.
    Skipped(String),
}

impl PrVerdict {
    /// Returns true for [`PrVerdict::Approved`].
    pub fn is_approved(&self) -> bool {
        matches!(self, PrVerdict::Approved(_))
    }

    /// The explanation carried by any verdict.
    pub fn reason(&self) -> &str {
        match self {
            PrVerdict::Approved(r) | PrVerdict::Rejected(r) | PrVerdict::Skipped(r) => r,
        }
    }
}

impl fmt::Display for PrVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrVerdict::Approved(_) => "approved",
            PrVerdict::Rejected(_) => "rejected",
            PrVerdict::Skipped(_) => "skipped",
        };
        write!(f, "{}: {}", label, self.reason())
    }
}

/// Validates PRs against file rules and the family issue-reference rule.
pub struct PrValidator<'a> {
    tracker: &'a dyn IssueTracker,
    family: String,
    rfc_label: String,
    file_rules: Vec<FileRule>,
    rfc_number: Regex,
}

impl<'a> PrValidator<'a> {
    /// Creates a validator from configuration.
    pub fn new(tracker: &'a dyn IssueTracker, config: &AutomationConfig) -> Result<Self> {
        Ok(Self {
            tracker,
            family: config.rfc.family.clone(),
            rfc_label: config.labels.rfc.clone(),
            file_rules: config.validation.file_rules.clone(),
            rfc_number: family_regex(&config.rfc.family, r"(\d+)")?,
        })
    }

    /// Decides whether a PR may be auto-merged.
    pub async fn validate(&self, pr_number: u64) -> Result<PrVerdict> {
        let pr = self.tracker.view_pull_request(pr_number).await?;
        tracing::info!(pr = pr_number, title = %pr.title, "validating PR for auto-merge");

        if let Some(rule) = self
            .file_rules
            .iter()
            .find(|r| mentions_id(&pr.title, &r.rfc))
        {
            return self.validate_files(&pr, rule).await;
        }

        if pr.title.contains(&format!("{}-RFC-", self.family)) {
            return self.validate_family(&pr).await;
        }

        tracing::info!(pr = pr_number, "not a recognised RFC PR");
        Ok(PrVerdict::Skipped("not a recognised RFC PR".to_string()))
    }

    async fn validate_files(&self, pr: &PullRequestInfo, rule: &FileRule) -> Result<PrVerdict> {
        let files = self.tracker.pull_request_files(pr.number).await?;
        tracing::debug!(pr = pr.number, rfc = %rule.rfc, files = ?files, "checking file rule");

        if files.iter().any(|f| !rule.files.contains(f)) {
            return Ok(PrVerdict::Rejected(format!(
                "too many files changed ({}); {} should only change {}",
                files.len(),
                rule.rfc,
                rule.files.join(", ")
            )));
        }

        if let Some(missing) = rule.files.iter().find(|f| !files.contains(*f)) {
            return Ok(PrVerdict::Rejected(format!(
                "{} not changed; {} requires it",
                missing, rule.rfc
            )));
        }

        Ok(PrVerdict::Approved(format!("{} validation passed", rule.rfc)))
    }

    async fn validate_family(&self, pr: &PullRequestInfo) -> Result<PrVerdict> {
        if !pr.closing_issues.is_empty() {
            return Ok(PrVerdict::Approved(format!(
                "references {} issue(s) via closing keywords",
                pr.closing_issues.len()
            )));
        }

        let suggestion = self.suggest_reference(&pr.title).await;
        let comment = self.guidance_comment(&suggestion);
        match self.tracker.comment_on_pull_request(pr.number, &comment).await {
            Ok(()) => tracing::info!(pr = pr.number, suggestion = %suggestion, "posted guidance comment"),
            Err(e) => tracing::warn!(pr = pr.number, error = %e, "could not post guidance comment"),
        }

        Ok(PrVerdict::Rejected(format!(
            "{}-RFC PRs must reference the implementation issue (suggested: {})",
            self.family, suggestion
        )))
    }

    /// Suggests a closing reference for the open RFC issue named in the title.
    async fn suggest_reference(&self, title: &str) -> String {
        let Some(digits) = self
            .rfc_number
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
        else {
            return UNKNOWN_ISSUE_SUGGESTION.to_string();
        };
        let needle = format!("{}-RFC-{}", self.family, digits);

        let query = IssueQuery::new(StateFilter::Open).with_label(&self.rfc_label);
        match self.tracker.list_issues(&query).await {
            Ok(issues) => {
                if let Some(issue) = issues.iter().find(|i| mentions_id(&i.title, &needle)) {
                    return format!("Fixes #{}", issue.number);
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not auto-detect issue number"),
        }

        UNKNOWN_ISSUE_SUGGESTION.to_string()
    }

    fn guidance_comment(&self, suggestion: &str) -> String {
        let mut comment = String::new();
        comment.push_str(&format!(
            "Hi! This PR looks like a {}-RFC implementation but it doesn't reference its tracking issue. \
             For full automation, please add a closing keyword to the PR description so the workflow can auto-merge it.\n\n",
            self.family
        ));
        comment.push_str("Add this line to the PR description:\n\n");
        comment.push_str(&format!("**{}**\n\n", suggestion));
        comment.push_str("After updating, the auto-merge workflow will re-run and merge automatically. Thanks!\n\n");
        comment.push_str("---\n\n");
        comment.push_str("🤖 *Automated guidance from PR validation workflow*");
        comment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{IssueState, MemoryTracker, NewIssue};

    fn pr(number: u64, title: &str, closing: Vec<u64>) -> PullRequestInfo {
        PullRequestInfo {
            number,
            title: title.to_string(),
            body: String::new(),
            closing_issues: closing,
        }
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn verdict(tracker: &MemoryTracker, number: u64) -> PrVerdict {
        let config = AutomationConfig::default();
        PrValidator::new(tracker, &config)
            .unwrap()
            .validate(number)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn file_rule_accepts_readme_only() {
        let tracker = MemoryTracker::new()
            .with_pull_request(pr(1, "Flow-RFC-001: README", vec![]), files(&["README.md"]));
        let v = verdict(&tracker, 1).await;
        assert!(v.is_approved(), "{}", v);
    }

    #[tokio::test]
    async fn file_rule_rejects_extra_files() {
        let tracker = MemoryTracker::new().with_pull_request(
            pr(1, "Flow-RFC-001: README", vec![]),
            files(&["README.md", "src/main.rs"]),
        );
        let v = verdict(&tracker, 1).await;
        assert!(matches!(v, PrVerdict::Rejected(_)));
        assert!(v.reason().contains("too many files changed (2)"));
    }

    #[tokio::test]
    async fn file_rule_rejects_missing_required_file() {
        let tracker = MemoryTracker::new()
            .with_pull_request(pr(1, "Flow-RFC-001: README", vec![]), files(&[]));
        let v = verdict(&tracker, 1).await;
        assert!(v.reason().contains("README.md not changed"));
    }

    #[tokio::test]
    async fn file_rule_needs_exact_rfc_number() {
        let tracker = MemoryTracker::new().with_pull_request(
            pr(6, "Flow-RFC-0010: Changelog", vec![]),
            files(&["CHANGELOG.md"]),
        );
        let v = verdict(&tracker, 6).await;
        assert!(matches!(v, PrVerdict::Skipped(_)), "{}", v);
    }

    #[tokio::test]
    async fn suggestion_ignores_longer_rfc_numbers() {
        let tracker = MemoryTracker::new()
            .with_issue(
                NewIssue::new("Implement Game-RFC-0040: Boss Level", "")
                    .with_labels(vec!["game-rfc".to_string()]),
                IssueState::Open,
            )
            .with_issue(
                NewIssue::new("Implement Game-RFC-004: Brick System", "")
                    .with_labels(vec!["game-rfc".to_string()]),
                IssueState::Open,
            )
            .with_pull_request(pr(7, "Implement Game-RFC-004: Brick System", vec![]), vec![]);

        verdict(&tracker, 7).await;
        let comments = tracker.pull_request_comments(7).await;
        assert!(comments[0].contains("**Fixes #2**"), "{}", comments[0]);
    }

    #[tokio::test]
    async fn family_pr_with_closing_reference_is_approved() {
        let tracker = MemoryTracker::new()
            .with_pull_request(pr(2, "Implement Game-RFC-004-1", vec![12]), vec![]);
        assert_eq!(
            verdict(&tracker, 2).await,
            PrVerdict::Approved("references 1 issue(s) via closing keywords".to_string())
        );
    }

    #[tokio::test]
    async fn family_pr_without_reference_gets_guidance() {
        let tracker = MemoryTracker::new()
            .with_issue(
                NewIssue::new("Implement Game-RFC-004: Brick System", "")
                    .with_labels(vec!["game-rfc".to_string()]),
                IssueState::Open,
            )
            .with_pull_request(pr(3, "Implement Game-RFC-004: Brick System", vec![]), vec![]);

        let v = verdict(&tracker, 3).await;
        assert!(matches!(v, PrVerdict::Rejected(_)));

        let comments = tracker.pull_request_comments(3).await;
        assert_eq!(comments.len(), 1);
        assert!(comments[0].contains("**Fixes #1**"));
    }

    #[tokio::test]
    async fn guidance_falls_back_to_placeholder() {
        let tracker = MemoryTracker::new()
            .with_pull_request(pr(4, "Implement Game-RFC-009: Audio", vec![]), vec![]);
        verdict(&tracker, 4).await;
        let comments = tracker.pull_request_comments(4).await;
        assert!(comments[0].contains("**Fixes #<issue-number>**"));
    }

    #[tokio::test]
    async fn unrelated_pr_is_skipped() {
        let tracker = MemoryTracker::new().with_pull_request(pr(5, "Bump deps", vec![]), vec![]);
        let v = verdict(&tracker, 5).await;
        assert!(matches!(v, PrVerdict::Skipped(_)));
        assert!(!v.is_approved());
    }

    #[test]
    fn verdict_serializes_tagged() {
        let json = serde_json::to_string(&PrVerdict::Skipped("x".to_string())).unwrap();
        assert_eq!(json, r#"{"verdict":"skipped","reason":"x"}"#);
    }
}
