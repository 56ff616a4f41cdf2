//! Automation configuration and validation.
//!
//! Configuration is an explicit value loaded once at startup (from TOML and
//! CLI flags) and passed down. Nothing below the binary reads the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rfc::{PROJECT_DIRS, SOURCE_EXTENSIONS};

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

/// Repository coordinates and bot identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Repository in `owner/name` form. When unset, `gh` infers it from the working directory.
    #[serde(default)]
    pub repo: Option<String>,
    /// Login of the bot actor that work is assigned to.
    #[serde(default = "default_bot_login")]
    pub bot_login: String,
    /// Path to the gh CLI binary.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
}

fn default_bot_login() -> String {
    "copilot-swe-agent".to_string()
}

fn default_cli_path() -> String {
    "gh".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            bot_login: default_bot_login(),
            cli_path: default_cli_path(),
        }
    }
}

/// Labels applied to created issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Labels for decomposed micro-issues.
    #[serde(default = "default_micro_issue_labels")]
    pub micro_issue: Vec<String>,
    /// Label marking whole-RFC tracking issues.
    #[serde(default = "default_rfc_label")]
    pub rfc: String,
}

fn default_micro_issue_labels() -> Vec<String> {
    vec!["micro-issue".to_string()]
}

fn default_rfc_label() -> String {
    "game-rfc".to_string()
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            micro_issue: default_micro_issue_labels(),
            rfc: default_rfc_label(),
        }
    }
}

/// Tables used by the RFC parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Actor mentioned at the top of each body.
    #[serde(default = "default_mention")]
    pub mention: Option<String>,
    /// Source-file extensions recognised in file-path hints.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    /// Project directory prefixes recognised for bare paths.
    #[serde(default = "default_project_dirs")]
    pub project_dirs: Vec<String>,
}

fn default_mention() -> Option<String> {
    Some("@copilot".to_string())
}

fn default_source_extensions() -> Vec<String> {
    SOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_project_dirs() -> Vec<String> {
    PROJECT_DIRS.iter().map(|s| s.to_string()).collect()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mention: default_mention(),
            source_extensions: default_source_extensions(),
            project_dirs: default_project_dirs(),
        }
    }
}

/// RFC series layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfcConfig {
    /// Family name used in identifiers (`<family>-RFC-<n>`).
    #[serde(default = "default_family")]
    pub family: String,
    /// Directory holding `RFC-<n>-*.md` specifications.
    #[serde(default = "default_rfc_dir")]
    pub rfc_dir: PathBuf,
}

fn default_family() -> String {
    "Game".to_string()
}

fn default_rfc_dir() -> PathBuf {
    PathBuf::from("docs/game-rfcs")
}

impl Default for RfcConfig {
    fn default() -> Self {
        Self {
            family: default_family(),
            rfc_dir: default_rfc_dir(),
        }
    }
}

impl RfcConfig {
    /// Formats an RFC identifier, e.g. `Game-RFC-004`.
    pub fn rfc_id(&self, number: u32) -> String {
        format!("{}-RFC-{:03}", self.family, number)
    }

    /// Formats a micro-issue identifier, e.g. `Game-RFC-004-2`.
    pub fn micro_id(&self, number: u32, micro: u32) -> String {
        format!("{}-{}", self.rfc_id(number), micro)
    }
}

/// PRs for an RFC that may only touch a fixed set of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRule {
    /// RFC identifier looked for in the PR title.
    pub rfc: String,
    /// Files the PR must change, and the only files it may change.
    pub files: Vec<String>,
}

/// PR auto-merge validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// File-restricted RFCs, checked before the family rules.
    #[serde(default = "default_file_rules")]
    pub file_rules: Vec<FileRule>,
}

fn default_file_rules() -> Vec<FileRule> {
    vec![FileRule {
        rfc: "Flow-RFC-001".to_string(),
        files: vec!["README.md".to_string()],
    }]
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            file_rules: default_file_rules(),
        }
    }
}

/// Top-level automation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Repository and bot settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Issue labels.
    #[serde(default)]
    pub labels: LabelsConfig,
    /// Parser tables.
    #[serde(default)]
    pub parser: ParserConfig,
    /// RFC series layout.
    #[serde(default)]
    pub rfc: RfcConfig,
    /// PR validation rules.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl AutomationConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Validate for GitHubConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Some(repo) = &self.repo {
            let parts: Vec<&str> = repo.split('/').collect();
            if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
                result.add_error(format!("repo '{}' must be in owner/name form", repo));
            }
        }

        if self.bot_login.trim().is_empty() {
            result.add_error("bot_login cannot be empty");
        }

        if self.cli_path.trim().is_empty() {
            result.add_error("cli_path cannot be empty");
        }

        result
    }
}

impl Validate for ParserConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.source_extensions.is_empty() {
            result.add_error("parser.source_extensions cannot be empty");
        }

        if self.mention.as_deref().map_or(true, |m| m.trim().is_empty()) {
            result.add_warning("no mention configured - issues will not ping an actor");
        }

        result
    }
}

impl Validate for AutomationConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        result.merge(self.github.validate());
        result.merge(self.parser.validate());

        if !is_identifier(&self.rfc.family) {
            result.add_error(format!(
                "rfc.family '{}' must start with a letter and contain only letters, digits or '_'",
                self.rfc.family
            ));
        }

        if self.labels.rfc.trim().is_empty() {
            result.add_error("labels.rfc cannot be empty");
        }

        for rule in &self.validation.file_rules {
            if rule.files.is_empty() {
                result.add_warning(format!(
                    "file rule for '{}' lists no files - every PR for it will be rejected",
                    rule.rfc
                ));
            }
        }

        result
    }
}
