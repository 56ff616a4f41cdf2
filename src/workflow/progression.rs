//! Assigns the next micro-issue in a sequence once a PR closes the previous one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::{AutomationConfig, RfcConfig};
use crate::error::{Error, Result};
use crate::github::{assign_login, IssueQuery, IssueTracker, PullRequestInfo, StateFilter};

use super::{capture_number, family_regex, mentions_id};

static CLOSING_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:close[sd]?|fixe?[sd]?|resolve[sd]?)\s+#(\d+)").unwrap()
});

/// What a progression step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProgressionOutcome {
    /// The PR does not identify a closed issue.
    NoClosedIssue,
    /// The closed issue's title is not a micro-issue title.
    NotMicroIssue,
    /// No open issue continues the sequence.
    SequenceComplete,
    /// The next issue was assigned.
    Assigned {
        /// The newly assigned issue.
        issue: u64,
        /// The issue the PR closed.
        previous: u64,
    },
}

/// Moves the bot along a micro-issue sequence.
pub struct Progression<'a> {
    tracker: &'a dyn IssueTracker,
    rfc: RfcConfig,
    bot_login: String,
    micro_id: Regex,
}

impl<'a> Progression<'a> {
    /// Creates a progression step from configuration.
    pub fn new(tracker: &'a dyn IssueTracker, config: &AutomationConfig) -> Result<Self> {
        Ok(Self {
            tracker,
            micro_id: family_regex(&config.rfc.family, r"(\d+)-(\d+)")?,
            rfc: config.rfc.clone(),
            bot_login: config.github.bot_login.clone(),
        })
    }

    /// Handles a merged pull request.
    pub async fn advance(&self, pr_number: u64) -> Result<ProgressionOutcome> {
        let pr = self.tracker.view_pull_request(pr_number).await?;
        tracing::info!(pr = pr_number, title = %pr.title, "advancing micro-issue sequence");

        let Some(closed) = self.find_closed_issue(&pr).await? else {
            tracing::info!(pr = pr_number, "could not determine which issue the PR closed");
            return Ok(ProgressionOutcome::NoClosedIssue);
        };

        let issue = self.tracker.view_issue(closed).await?;
        let (Some(rfc), Some(micro)) = (
            capture_number(&self.micro_id, &issue.title, 1),
            capture_number(&self.micro_id, &issue.title, 2),
        ) else {
            tracing::info!(issue = closed, title = %issue.title, "closed issue is not a micro-issue");
            return Ok(ProgressionOutcome::NotMicroIssue);
        };

        let next_micro = micro + 1;
        let next_prefix = format!("{}:", self.rfc.micro_id(rfc, next_micro));
        tracing::debug!(next = %next_prefix, "looking for next micro-issue");

        let open = self
            .tracker
            .list_issues(&IssueQuery::new(StateFilter::Open))
            .await?;
        let Some(next) = open.iter().find(|i| i.title.contains(&next_prefix)) else {
            tracing::info!(rfc = %self.rfc.rfc_id(rfc), "no more micro-issues in sequence");
            return Ok(ProgressionOutcome::SequenceComplete);
        };

        if !assign_login(self.tracker, next.number, &self.bot_login).await? {
            return Err(Error::Workflow(format!(
                "failed to assign issue #{} to {}",
                next.number, self.bot_login
            )));
        }

        let comment = self.progression_comment(closed, rfc, micro, next_micro, pr_number);
        if let Err(e) = self.tracker.comment_on_issue(next.number, &comment).await {
            tracing::warn!(issue = next.number, error = %e, "failed to add progression comment");
        }

        tracing::info!(issue = next.number, previous = closed, "assigned next micro-issue");
        Ok(ProgressionOutcome::Assigned {
            issue: next.number,
            previous: closed,
        })
    }

    async fn find_closed_issue(&self, pr: &PullRequestInfo) -> Result<Option<u64>> {
        for text in [&pr.body, &pr.title] {
            if let Some(number) = closing_reference(text) {
                return Ok(Some(number));
            }
        }

        if let Some(&number) = pr.closing_issues.first() {
            return Ok(Some(number));
        }

        let Some(found) = self.micro_id.find(&pr.title) else {
            return Ok(None);
        };
        let micro_id = found.as_str();
        let issues = self
            .tracker
            .list_issues(&IssueQuery::new(StateFilter::All))
            .await?;
        Ok(issues
            .iter()
            .find(|i| mentions_id(&i.title, micro_id))
            .map(|i| i.number))
    }

    fn progression_comment(
        &self,
        previous: u64,
        rfc: u32,
        micro: u32,
        next_micro: u32,
        pr_number: u64,
    ) -> String {
        let mut comment = String::new();
        comment.push_str("🔄 **Auto-assigned from micro-issue progression**\n\n");
        comment.push_str(&format!(
            "Previous micro-issue #{} completed: {}\n",
            previous,
            self.rfc.micro_id(rfc, micro)
        ));
        comment.push_str(&format!(
            "This is the next sequential task: {}\n\n",
            self.rfc.micro_id(rfc, next_micro)
        ));
        comment.push_str(&format!(
            "**Auto-progression**: Assigned after PR #{} was merged.",
            pr_number
        ));
        comment
    }
}

/// Finds the first `Fixes #n`-style reference in text.
pub fn closing_reference(text: &str) -> Option<u64> {
    CLOSING_KEYWORD
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}
