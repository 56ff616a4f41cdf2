//! Replaces a failed micro-issue with a fresh copy assigned to the bot.

use serde::Serialize;

use crate::config::AutomationConfig;
use crate::error::Result;
use crate::github::{assign_login, CloseReason, IssueTracker, NewIssue};

const CLOSE_COMMENT: &str =
    "Issue recreated due to implementation failures. See replacement issue.";

/// Result of recreating an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecreateOutcome {
    /// Number of the replacement issue.
    pub number: u64,
    /// Whether the bot was assigned to it.
    pub assigned: bool,
}

/// Closes an issue as not planned and opens a replacement.
pub struct Recreator<'a> {
    tracker: &'a dyn IssueTracker,
    bot_login: String,
}

impl<'a> Recreator<'a> {
    /// Creates a recreator from configuration.
    pub fn new(tracker: &'a dyn IssueTracker, config: &AutomationConfig) -> Self {
        Self {
            tracker,
            bot_login: config.github.bot_login.clone(),
        }
    }

    /// Closes `original` as not planned and opens a `🔄` copy assigned to the bot.
    pub async fn recreate(&self, original: u64) -> Result<RecreateOutcome> {
        let issue = self.tracker.view_issue(original).await?;
        tracing::info!(issue = original, title = %issue.title, "recreating issue");

        self.tracker
            .close_issue(original, CloseReason::NotPlanned, CLOSE_COMMENT)
            .await?;

        let replacement = NewIssue::new(
            format!("🔄 {}", issue.title),
            replacement_body(original, &issue.body),
        )
        .with_labels(issue.labels.clone());
        let created = self.tracker.create_issue(&replacement).await?;
        tracing::info!(issue = created.number, original = original, "created replacement issue");

        let assigned = match assign_login(self.tracker, created.number, &self.bot_login).await {
            Ok(assigned) => assigned,
            Err(e) => {
                tracing::warn!(issue = created.number, error = %e, "replacement created but assignment failed");
                false
            }
        };

        Ok(RecreateOutcome {
            number: created.number,
            assigned,
        })
    }
}

fn replacement_body(original: u64, body: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("**Recreated from failed issue #{}**\n\n", original));
    out.push_str(body);
    out.push_str("\n\n---\n\n");
    out.push_str("**⚠️ Previous Attempt Failed**\n");
    out.push_str(
        "This issue was recreated due to workflow/implementation failures. Starting with a clean slate.\n\n",
    );
    out.push_str("**🎯 Fresh Implementation Required**");
    out
}
