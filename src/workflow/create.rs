//! Micro-issue creation from an RFC document.

use std::path::Path;

use serde::Serialize;

use crate::config::AutomationConfig;
use crate::error::{Error, Result};
use crate::github::{IssueTracker, NewIssue};
use crate::rfc::{MicroIssueTemplate, RfcParser};

/// An issue created for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedIssue {
    /// Number of the new issue.
    pub number: u64,
    /// Title it was created with.
    pub title: String,
    /// Whether the bot was assigned.
    pub assigned: bool,
}

/// Creates one issue per micro-issue template.
///
/// Only the first issue is assigned to the bot; later ones wait for
/// progression once their dependency closes.
pub struct MicroIssueCreator<'a> {
    tracker: &'a dyn IssueTracker,
    parser: RfcParser,
    labels: Vec<String>,
    bot_login: String,
}

impl<'a> MicroIssueCreator<'a> {
    /// Creates a creator from configuration.
    pub fn new(tracker: &'a dyn IssueTracker, config: &AutomationConfig) -> Result<Self> {
        Ok(Self {
            tracker,
            parser: RfcParser::new(&config.parser)?,
            labels: config.labels.micro_issue.clone(),
            bot_login: config.github.bot_login.clone(),
        })
    }

    /// Decomposes a document and creates its micro-issues.
    pub async fn create(&self, document: &str, rfc_id: &str) -> Result<Vec<CreatedIssue>> {
        let templates = self.parser.decompose(document, rfc_id);
        self.create_templates(rfc_id, &templates).await
    }

    /// Reads, decomposes and creates micro-issues for an RFC file.
    pub async fn create_from_file(&self, path: &Path, rfc_id: &str) -> Result<Vec<CreatedIssue>> {
        let templates = self.parser.decompose_file(path, rfc_id)?;
        self.create_templates(rfc_id, &templates).await
    }

    /// Creates issues for already decomposed templates.
    pub async fn create_templates(
        &self,
        rfc_id: &str,
        templates: &[MicroIssueTemplate],
    ) -> Result<Vec<CreatedIssue>> {
        if templates.is_empty() {
            return Err(Error::Workflow(format!(
                "no micro-issues could be derived from {}",
                rfc_id
            )));
        }

        tracing::info!(rfc = %rfc_id, count = templates.len(), "creating micro-issues");

        let actor_id = match self.tracker.resolve_actor_id(&self.bot_login).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                tracing::warn!(login = %self.bot_login, "bot not assignable, issues will be unassigned");
                None
            }
            Err(e) => {
                tracing::warn!(login = %self.bot_login, error = %e, "failed to resolve bot");
                None
            }
        };

        let mut created = Vec::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            let issue = self
                .tracker
                .create_issue(
                    &NewIssue::new(&template.title, &template.body).with_labels(self.labels.clone()),
                )
                .await?;

            let assigned = match (&actor_id, i) {
                (Some(actor_id), 0) => self.assign(issue.number, actor_id).await,
                _ => {
                    tracing::info!(issue = issue.number, "left unassigned until dependencies close");
                    false
                }
            };

            created.push(CreatedIssue {
                number: issue.number,
                title: issue.title,
                assigned,
            });
        }

        tracing::info!(rfc = %rfc_id, count = created.len(), "created micro-issues");
        Ok(created)
    }

    async fn assign(&self, number: u64, actor_id: &str) -> bool {
        match self.tracker.assign_actor(number, actor_id).await {
            Ok(assignees) => {
                let assigned = assignees.iter().any(|a| a == &self.bot_login);
                tracing::info!(issue = number, assignees = ?assignees, "assigned first micro-issue");
                assigned
            }
            Err(e) => {
                tracing::error!(issue = number, error = %e, "failed to assign first micro-issue");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::MemoryTracker;

    const DOC: &str = "# Game-RFC-004: Brick System\n\
        ## Game-RFC-004-1: Create Brick Model\n- Position and size\n\
        ## Game-RFC-004-2: Brick Collision\nThe collision system must detect hits.\n\
        ## Notes\nNothing.\n";

    fn config() -> AutomationConfig {
        AutomationConfig::default()
    }

    #[tokio::test]
    async fn creates_issues_and_assigns_first_only() {
        let tracker = MemoryTracker::new().with_actor("copilot-swe-agent", "BOT_1");
        let config = config();
        let creator = MicroIssueCreator::new(&tracker, &config).unwrap();

        let created = creator.create(DOC, "Game-RFC-004").await.unwrap();
        assert_eq!(
            created,
            vec![
                CreatedIssue {
                    number: 1,
                    title: "Game-RFC-004-1: Create Brick Model".to_string(),
                    assigned: true,
                },
                CreatedIssue {
                    number: 2,
                    title: "Game-RFC-004-2: Brick Collision".to_string(),
                    assigned: false,
                },
            ]
        );

        let issues = tracker.issues().await;
        assert_eq!(issues[0].assignees, vec!["copilot-swe-agent"]);
        assert!(issues[1].assignees.is_empty());
        assert!(issues.iter().all(|i| i.labels == vec!["micro-issue"]));
        assert!(issues[1].body.contains("**Dependencies**: Game-RFC-004-1"));
    }

    #[tokio::test]
    async fn unresolved_bot_still_creates_issues() {
        let tracker = MemoryTracker::new();
        let config = config();
        let creator = MicroIssueCreator::new(&tracker, &config).unwrap();

        let created = creator.create(DOC, "Game-RFC-004").await.unwrap();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|c| !c.assigned));
    }

    #[tokio::test]
    async fn empty_decomposition_is_an_error() {
        let tracker = MemoryTracker::new();
        let config = config();
        let creator = MicroIssueCreator::new(&tracker, &config).unwrap();

        let result = creator.create("## Notes\nnothing\n", "Game-RFC-009").await;
        assert!(matches!(result, Err(Error::Workflow(_))));
        assert!(tracker.issues().await.is_empty());
    }

    #[tokio::test]
    async fn create_from_file_reads_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("RFC-004-Brick-System.md");
        std::fs::write(&path, DOC).unwrap();

        let tracker = MemoryTracker::new();
        let config = config();
        let creator = MicroIssueCreator::new(&tracker, &config).unwrap();

        let created = creator.create_from_file(&path, "Game-RFC-004").await.unwrap();
        assert_eq!(created.len(), 2);
        assert!(tracker.issues().await[0]
            .body
            .contains("`RFC-004-Brick-System.md`"));
    }
}
