//! RFC Autopilot - decomposes RFC documents into micro-issues and drives them through GitHub
//!
//! This library provides the RFC parser that turns a design document into ordered,
//! dependency-linked micro-issue templates, plus the issue workflows (creation,
//! progression, PR validation, next-RFC planning and recreation) built on top of it.

pub mod config;
pub mod error;
pub mod github;
pub mod rfc;
pub mod workflow;

pub use error::{Error, Result};

pub use config::{
    AutomationConfig, FileRule, GitHubConfig, LabelsConfig, ParserConfig, RfcConfig, Validate,
    ValidationConfig, ValidationResult,
};
pub use github::{
    CloseReason, GhClient, Issue, IssueQuery, IssueState, IssueTracker, MemoryTracker, NewIssue,
    PullRequestInfo, StateFilter,
};
pub use rfc::{
    decompose, estimate_complexity, extract_file_paths, parse_structure, Complexity,
    MicroIssueTemplate, NamingConvention, RfcParser, Section,
};
pub use workflow::{
    CreatedIssue, MicroIssueCreator, NextRfcPlanner, PrValidator, PrVerdict, Progression,
    ProgressionOutcome, RecreateOutcome, Recreator, RfcCandidate, RfcSpec,
};
