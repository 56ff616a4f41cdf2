//! Picks the next RFC whose dependencies are complete and opens an issue for it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::{AutomationConfig, RfcConfig};
use crate::error::{Error, Result};
use crate::github::{assign_login, Issue, IssueQuery, IssueTracker, NewIssue, StateFilter};

use super::{capture_number, family_regex};

static FILE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"RFC-(\d+)").unwrap());
static DEPENDENCIES_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Dependencies\*\*:\s*(.+)").unwrap());
static PRIORITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*Priority\*\*:\s*(\w+)").unwrap());

const UNKNOWN_TITLE: &str = "Unknown Feature";
const DEFAULT_PRIORITY: &str = "Medium";

/// Metadata read from an RFC specification file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RfcSpec {
    /// RFC number taken from the file name.
    pub number: u32,
    /// Path of the RFC file.
    pub path: PathBuf,
    /// Feature title from the `# <Family>-RFC-<n>:` heading.
    pub title: String,
    /// RFC numbers this one depends on.
    pub dependencies: Vec<u32>,
    /// `**Priority**` value, `Medium` when absent.
    pub priority: String,
}

impl RfcSpec {
    fn is_high_priority(&self) -> bool {
        self.priority == "High"
    }
}

/// The RFC chosen for implementation and the issue that would track it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RfcCandidate {
    /// The RFC to implement.
    pub spec: RfcSpec,
    /// Title of the tracking issue.
    pub issue_title: String,
    /// Markdown body of the tracking issue.
    pub issue_body: String,
}

/// Plans and opens the next RFC implementation issue.
pub struct NextRfcPlanner<'a> {
    tracker: &'a dyn IssueTracker,
    rfc: RfcConfig,
    label: String,
    bot_login: String,
    mention: Option<String>,
    title: Regex,
    reference: Regex,
}

impl<'a> NextRfcPlanner<'a> {
    /// Creates a planner from configuration.
    pub fn new(tracker: &'a dyn IssueTracker, config: &AutomationConfig) -> Result<Self> {
        let family = regex::escape(&config.rfc.family);
        let title = Regex::new(&format!(r"(?m)^# {}-RFC-\d+:\s*(.+)", family))
            .map_err(|e| Error::Config(format!("invalid RFC title pattern: {}", e)))?;

        Ok(Self {
            tracker,
            rfc: config.rfc.clone(),
            label: config.labels.rfc.clone(),
            bot_login: config.github.bot_login.clone(),
            mention: config.parser.mention.clone().filter(|m| !m.trim().is_empty()),
            title,
            reference: family_regex(&config.rfc.family, r"(\d+)")?,
        })
    }

    /// Lists the RFC files in the configured directory, keyed by number.
    pub fn available_specs(&self) -> Result<BTreeMap<u32, PathBuf>> {
        let pattern = self.rfc.rfc_dir.join("RFC-*.md");
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("invalid RFC glob {}: {}", pattern, e)))?;

        let mut specs = BTreeMap::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable RFC path");
                    continue;
                }
            };
            let number = path
                .file_name()
                .and_then(|name| capture_number(&FILE_NUMBER, &name.to_string_lossy(), 1));
            if let Some(number) = number {
                specs.insert(number, path);
            }
        }

        tracing::debug!(dir = %self.rfc.rfc_dir.display(), count = specs.len(), "scanned RFC specs");
        Ok(specs)
    }

    /// Parses title, dependencies and priority from an RFC document.
    pub fn parse_spec(&self, number: u32, path: &Path, content: &str) -> RfcSpec {
        let title = self
            .title
            .captures(content)
            .map(|caps| caps[1].trim().to_string())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let dependencies = DEPENDENCIES_LINE
            .captures(content)
            .map(|caps| {
                self.reference
                    .captures_iter(&caps[1])
                    .filter_map(|dep| dep[1].parse().ok())
                    .collect::<Vec<u32>>()
            })
            .unwrap_or_default();

        let priority = PRIORITY
            .captures(content)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());

        RfcSpec {
            number,
            path: path.to_path_buf(),
            title,
            dependencies,
            priority,
        }
    }

    fn read_spec(&self, number: u32, path: &Path) -> RfcSpec {
        match std::fs::read_to_string(path) {
            Ok(content) => self.parse_spec(number, path, &content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read RFC, using defaults");
                self.parse_spec(number, path, "")
            }
        }
    }

    /// RFC numbers named by labelled issues in the given state.
    async fn tracked_rfcs(&self, state: StateFilter) -> Result<BTreeSet<u32>> {
        let query = IssueQuery::new(state).with_label(&self.label);
        let issues = self.tracker.list_issues(&query).await?;
        Ok(issues
            .iter()
            .filter_map(|issue| capture_number(&self.reference, &issue.title, 1))
            .collect())
    }

    /// Chooses the next RFC to implement, if any is ready.
    pub async fn plan(&self) -> Result<Option<RfcCandidate>> {
        let completed = self.tracked_rfcs(StateFilter::Closed).await?;
        let in_progress = self.tracked_rfcs(StateFilter::Open).await?;
        let available = self.available_specs()?;
        let numbers: Vec<u32> = available.keys().copied().collect();

        tracing::info!(
            completed = ?completed,
            in_progress = ?in_progress,
            available = ?numbers,
            "RFC status"
        );

        let mut candidates = Vec::new();
        for (number, path) in &available {
            if completed.contains(number) || in_progress.contains(number) {
                continue;
            }

            let spec = self.read_spec(*number, path);
            let missing: Vec<u32> = spec
                .dependencies
                .iter()
                .copied()
                .filter(|dep| !completed.contains(dep))
                .collect();

            if missing.is_empty() {
                tracing::info!(rfc = %self.rfc.rfc_id(*number), title = %spec.title, "ready");
                candidates.push(spec);
            } else {
                tracing::info!(rfc = %self.rfc.rfc_id(*number), missing = ?missing, "waiting on dependencies");
            }
        }

        candidates.sort_by_key(|spec| (spec.number, !spec.is_high_priority()));

        let Some(spec) = candidates.into_iter().next() else {
            tracing::info!("no RFCs ready to implement");
            return Ok(None);
        };

        Ok(Some(RfcCandidate {
            issue_title: format!("Implement {}: {}", self.rfc.rfc_id(spec.number), spec.title),
            issue_body: self.issue_body(&spec, &completed),
            spec,
        }))
    }

    /// Plans the next RFC and opens its issue, assigned to the bot.
    pub async fn create_next(&self) -> Result<Option<Issue>> {
        let Some(candidate) = self.plan().await? else {
            return Ok(None);
        };

        let issue = self
            .tracker
            .create_issue(
                &NewIssue::new(candidate.issue_title, candidate.issue_body)
                    .with_labels(vec![self.label.clone()]),
            )
            .await?;

        match assign_login(self.tracker, issue.number, &self.bot_login).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(issue = issue.number, "RFC issue created but not assigned"),
            Err(e) => tracing::warn!(issue = issue.number, error = %e, "failed to assign RFC issue"),
        }

        self.tracker.view_issue(issue.number).await.map(Some)
    }

    fn issue_body(&self, spec: &RfcSpec, completed: &BTreeSet<u32>) -> String {
        let rfc_id = self.rfc.rfc_id(spec.number);
        let path = spec.path.display();
        let mut body = String::new();

        body.push_str(&format!("## 📋 Auto-Generated {} Implementation\n\n", rfc_id));
        body.push_str(&format!("**RFC Specification**: `{}`\n", path));
        body.push_str(&format!("**Priority**: {}\n", spec.priority));
        body.push_str(
            "**Auto-Generated**: This issue was created automatically by the RFC progression workflow\n\n",
        );

        body.push_str("### 📚 Implementation Requirements\n\n");
        body.push_str(&format!(
            "Please implement {} according to the specification in `{}`.\n\n",
            rfc_id, path
        ));

        body.push_str("### 🔗 Dependencies\n");
        if spec.dependencies.is_empty() {
            body.push_str("None (foundation RFC)\n");
        } else {
            for dep in &spec.dependencies {
                let status = if completed.contains(dep) {
                    "✅ COMPLETED"
                } else {
                    "❌ PENDING"
                };
                body.push_str(&format!("- {}: {}\n", self.rfc.rfc_id(*dep), status));
            }
        }
        body.push('\n');

        if let Some(mention) = &self.mention {
            body.push_str("### 🎯 Assignment\n");
            body.push_str(&format!(
                "{} please implement this RFC according to the specification.\n\n",
                mention
            ));
        }

        body.push_str("### 🔧 Implementation Guidelines\n");
        body.push_str("- Follow the acceptance criteria in the RFC specification\n");
        body.push_str("- Use the architecture patterns from previous RFCs\n");
        body.push_str("- Ensure no regression in existing functionality\n");
        body.push_str(&format!(
            "- Create PR with title: `Implement {}: {}`\n",
            rfc_id, spec.title
        ));
        body.push_str("- Include `Fixes #[this-issue-number]` in PR description\n\n");

        body.push_str("### ✅ Definition of Done\n");
        body.push_str("- All acceptance criteria from RFC specification completed\n");
        body.push_str("- Code compiles without warnings\n");
        body.push_str("- Feature works as demonstrated manually\n");
        body.push_str("- Follows project conventions\n");
        body.push_str("- Ready for next RFC implementation\n\n");

        body.push_str("---\n\n");
        body.push_str("**🤖 Generated by RFC Automation Workflow**");
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{IssueState, MemoryTracker};
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn rfc_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "RFC-001-Console-Shell.md",
            "# Game-RFC-001: Console Game Shell\n**Priority**: High\n**Dependencies**: None\n",
        );
        write(
            dir.path(),
            "RFC-002-Paddle.md",
            "# Game-RFC-002: Paddle Implementation\n**Priority**: High\n**Dependencies**: Game-RFC-001\n",
        );
        write(
            dir.path(),
            "RFC-003-Ball.md",
            "# Game-RFC-003: Ball Physics\n**Dependencies**: Game-RFC-001, Game-RFC-002\n",
        );
        write(dir.path(), "notes.md", "# Not an RFC\n");
        dir
    }

    fn config(dir: &Path) -> AutomationConfig {
        let mut config = AutomationConfig::default();
        config.rfc.rfc_dir = dir.to_path_buf();
        config
    }

    fn rfc_issue(title: &str) -> NewIssue {
        NewIssue::new(title, "").with_labels(vec!["game-rfc".to_string()])
    }

    #[test]
    fn parse_spec_reads_metadata() {
        let tracker = MemoryTracker::new();
        let config = AutomationConfig::default();
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        let spec = planner.parse_spec(
            3,
            Path::new("RFC-003-Ball.md"),
            "# Game-RFC-003: Ball Physics \n**Dependencies**: Game-RFC-001, Game-RFC-002 (paddle)\n**Priority**: Low\n",
        );
        assert_eq!(spec.title, "Ball Physics");
        assert_eq!(spec.dependencies, vec![1, 2]);
        assert_eq!(spec.priority, "Low");
    }

    #[test]
    fn parse_spec_defaults() {
        let tracker = MemoryTracker::new();
        let config = AutomationConfig::default();
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        let spec = planner.parse_spec(7, Path::new("RFC-007.md"), "no metadata here");
        assert_eq!(spec.title, "Unknown Feature");
        assert!(spec.dependencies.is_empty());
        assert_eq!(spec.priority, "Medium");
    }

    #[test]
    fn available_specs_keys_by_number() {
        let dir = rfc_dir();
        let tracker = MemoryTracker::new();
        let config = config(dir.path());
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        let specs = planner.available_specs().unwrap();
        assert_eq!(specs.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn first_rfc_is_chosen_when_nothing_tracked() {
        let dir = rfc_dir();
        let tracker = MemoryTracker::new();
        let config = config(dir.path());
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        let candidate = planner.plan().await.unwrap().unwrap();
        assert_eq!(candidate.spec.number, 1);
        assert_eq!(candidate.issue_title, "Implement Game-RFC-001: Console Game Shell");
        assert!(candidate.issue_body.contains("None (foundation RFC)"));
    }

    #[tokio::test]
    async fn skips_completed_and_in_progress_and_waits_for_dependencies() {
        let dir = rfc_dir();
        let tracker = MemoryTracker::new()
            .with_issue(
                rfc_issue("Implement Game-RFC-001: Console Game Shell"),
                IssueState::Closed,
            )
            .with_issue(
                rfc_issue("Implement Game-RFC-002: Paddle Implementation"),
                IssueState::Open,
            );
        let config = config(dir.path());
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        // 2 is in progress, 3 waits on 2
        assert_eq!(planner.plan().await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_next_opens_labelled_assigned_issue() {
        let dir = rfc_dir();
        let tracker = MemoryTracker::new()
            .with_actor("copilot-swe-agent", "BOT_1")
            .with_issue(
                rfc_issue("Implement Game-RFC-001: Console Game Shell"),
                IssueState::Closed,
            );
        let config = config(dir.path());
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        let issue = planner.create_next().await.unwrap().unwrap();
        assert_eq!(issue.title, "Implement Game-RFC-002: Paddle Implementation");
        assert_eq!(issue.labels, vec!["game-rfc"]);
        assert_eq!(issue.assignees, vec!["copilot-swe-agent"]);
        assert!(issue.body.contains("- Game-RFC-001: ✅ COMPLETED"));
        assert!(issue.body.contains("**Priority**: High"));
        assert!(issue.body.contains("@copilot please implement"));
    }

    #[tokio::test]
    async fn create_next_without_candidate_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let tracker = MemoryTracker::new();
        let config = config(dir.path());
        let planner = NextRfcPlanner::new(&tracker, &config).unwrap();

        assert!(planner.create_next().await.unwrap().is_none());
        assert!(tracker.issues().await.is_empty());
    }
}
