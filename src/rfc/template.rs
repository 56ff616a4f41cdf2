//! Micro-issue templates and their rendered bodies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::classify::NamingConvention;
use super::complexity::Complexity;
use super::section::Section;

/// Definition-of-done checklist appended to every micro-issue.
pub const DEFINITION_OF_DONE: [&str; 4] = [
    "Implementation matches RFC specifications",
    "Code compiles without warnings",
    "Basic functionality working",
    "Integration tests pass (if applicable)",
];

/// Maximum number of requirement lines quoted in a body.
pub const MAX_REQUIREMENTS: usize = 5;

/// Maximum number of expected files listed in a body.
pub const MAX_LISTED_FILES: usize = 5;

/// Line shown when no file paths were extracted.
pub const NO_FILES_LINE: &str = "- Files as specified in the RFC section";

/// Words that mark a prose line as a requirement.
const REQUIREMENT_WORDS: &[&str] = &["must", "should", "implement"];

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[-*] |\d+\. )").unwrap());

/// Structured contents of a micro-issue body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueBody {
    /// Actor mentioned in the request line (e.g. `@copilot`).
    pub mention: Option<String>,
    /// Parent RFC identifier.
    pub rfc_id: String,
    /// Source document name, when known.
    pub source: Option<String>,
    /// Section title the issue was derived from.
    pub section_title: String,
    /// Estimated complexity.
    pub complexity: Complexity,
    /// Expected file paths.
    pub files: Vec<String>,
    /// Requirements excerpt.
    pub requirements: String,
    /// Ids of micro-issues this one depends on.
    pub dependencies: Vec<String>,
}

impl IssueBody {
    /// Renders the body as markdown.
    pub fn render(&self) -> String {
        let source = self.source.as_deref().unwrap_or(&self.rfc_id);
        let mut body = String::new();

        match &self.mention {
            Some(mention) => body.push_str(&format!(
                "{} Please implement the {} from {}.\n\n",
                mention, self.section_title, source
            )),
            None => body.push_str(&format!(
                "Please implement the {} from {}.\n\n",
                self.section_title, source
            )),
        }

        body.push_str("## Scope\n");
        body.push_str(&format!(
            "{} as specified in the RFC document.\n\n",
            self.section_title
        ));

        body.push_str("## Implementation Reference\n");
        body.push_str(&format!("**RFC Document**: `{}`\n", source));
        body.push_str(&format!("**Section**: {}\n", self.section_title));
        body.push_str(&format!("**Complexity**: {}\n\n", self.complexity.label()));

        body.push_str("## Key Requirements\n");
        body.push_str(&self.requirements);
        body.push_str("\n\n");

        body.push_str("## Files Expected\n");
        if self.files.is_empty() {
            body.push_str(NO_FILES_LINE);
            body.push('\n');
        } else {
            for file in self.files.iter().take(MAX_LISTED_FILES) {
                body.push_str(&format!("- `{}`\n", file));
            }
        }
        body.push('\n');

        body.push_str("## Definition of Done\n");
        for item in DEFINITION_OF_DONE {
            body.push_str(&format!("- [ ] {}\n", item));
        }
        body.push('\n');

        body.push_str(&format!("**Parent RFC**: {}\n", self.rfc_id));
        if self.dependencies.is_empty() {
            body.push_str("**Dependencies**: None\n");
        } else {
            body.push_str(&format!(
                "**Dependencies**: {}\n",
                self.dependencies.join(", ")
            ));
        }

        body.push_str("\n---\n");
        body.push_str("*This micro-issue was automatically generated from RFC structure analysis*\n");

        body
    }
}

/// One unit of decomposed work, ready to become an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroIssueTemplate {
    /// Identifier used for dependency links (e.g. `Game-RFC-004-1`).
    pub id: String,
    /// Issue title.
    pub title: String,
    /// Rendered markdown body.
    pub body: String,
    /// Ids of templates this one depends on.
    pub dependencies: Vec<String>,
    /// Estimated complexity.
    pub estimated_complexity: Complexity,
    /// Expected file paths, in first-seen order.
    pub files_expected: Vec<String>,
    /// Structured body the markdown is rendered from.
    #[serde(skip)]
    pub content: IssueBody,
}

impl MicroIssueTemplate {
    /// Adds a dependency and re-renders the body.
    pub fn depend_on(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.dependencies.contains(&id) {
            return;
        }
        self.dependencies.push(id);
        self.content.dependencies = self.dependencies.clone();
        self.body = self.content.render();
    }
}

/// Extracts up to five requirement lines, falling back to the first two sentences.
pub fn extract_requirements(content: &str) -> String {
    let requirements: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| is_requirement_line(line))
        .take(MAX_REQUIREMENTS)
        .collect();

    if !requirements.is_empty() {
        return requirements.join("\n");
    }

    content
        .trim()
        .split(". ")
        .take(2)
        .map(|sentence| sentence.trim().trim_end_matches('.'))
        .filter(|sentence| !sentence.is_empty())
        .map(|sentence| format!("{}.", sentence))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_requirement_line(line: &str) -> bool {
    if LIST_ITEM.is_match(line) {
        return true;
    }
    let lowered = line.to_lowercase();
    REQUIREMENT_WORDS.iter().any(|word| lowered.contains(word))
}

/// Inputs shared by every template rendered from one document.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Parent RFC identifier.
    pub rfc_id: &'a str,
    /// Naming convention detected from the identifier.
    pub convention: &'a NamingConvention,
    /// Source document name.
    pub source: Option<&'a str>,
    /// Actor mentioned in the request line.
    pub mention: Option<&'a str>,
}

/// Renders one template for a classified section.
///
/// `index` is 1-based. Dependencies are left empty; the caller assigns them.
pub fn render(
    ctx: &RenderContext<'_>,
    index: usize,
    section: &Section,
    files: Vec<String>,
    complexity: Complexity,
) -> MicroIssueTemplate {
    let (id, title) = match ctx.convention.task_id(&section.title) {
        Some(task_id) => (task_id.to_string(), section.title.clone()),
        None => {
            let id = format!("{}-{}", ctx.rfc_id, index);
            let title = format!("{}: {}", id, section.title);
            (id, title)
        }
    };

    let content = IssueBody {
        mention: ctx.mention.map(str::to_string),
        rfc_id: ctx.rfc_id.to_string(),
        source: ctx.source.map(str::to_string),
        section_title: section.title.clone(),
        complexity,
        files: files.clone(),
        requirements: extract_requirements(&section.content),
        dependencies: Vec::new(),
    };

    MicroIssueTemplate {
        id,
        title,
        body: content.render(),
        dependencies: Vec::new(),
        estimated_complexity: complexity,
        files_expected: files,
        content,
    }
}
