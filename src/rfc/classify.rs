//! Classification of sections into implementable units of work.

use once_cell::sync::Lazy;
use regex::Regex;

use super::section::Section;

/// Title keywords that mark a section as implementable under the heuristic convention.
pub const IMPLEMENTATION_KEYWORDS: &[&str] = &[
    "object model",
    "class",
    "system",
    "implementation",
    "integration",
    "component",
    "service",
    "manager",
];

/// Family RFC identifiers look like `Game-RFC-004`.
static FAMILY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)-RFC-(\d+)$").unwrap());

/// How a document encodes its units of work.
#[derive(Debug, Clone)]
pub enum NamingConvention {
    /// Pre-decomposed document whose headings carry `<family>-RFC-<n>-<m>:` titles.
    Family {
        /// Family name, e.g. `Game`.
        family: String,
        /// Pattern matched against section titles.
        task_title: Regex,
    },
    /// Any other document; sections are classified by keywords and code blocks.
    Heuristic,
}

impl NamingConvention {
    /// Detects the convention from an RFC identifier.
    ///
    /// Identifiers that do not match the family pattern fall back to the
    /// heuristic convention.
    pub fn detect(rfc_id: &str) -> Self {
        let Some(family) = FAMILY_ID
            .captures(rfc_id.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            return NamingConvention::Heuristic;
        };

        match family_task_pattern(&family) {
            Some(task_title) => NamingConvention::Family { family, task_title },
            None => NamingConvention::Heuristic,
        }
    }

    /// Returns true for the strict numbered convention.
    pub fn is_family(&self) -> bool {
        matches!(self, NamingConvention::Family { .. })
    }

    /// Returns the micro-task id (`Game-RFC-004-1`) prefixing a family title.
    pub fn task_id<'a>(&self, title: &'a str) -> Option<&'a str> {
        match self {
            NamingConvention::Family { task_title, .. } => {
                task_title.captures(title)?.get(1).map(|m| m.as_str())
            }
            NamingConvention::Heuristic => None,
        }
    }
}

impl PartialEq for NamingConvention {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                NamingConvention::Family { family: a, .. },
                NamingConvention::Family { family: b, .. },
            ) => a == b,
            (NamingConvention::Heuristic, NamingConvention::Heuristic) => true,
            _ => false,
        }
    }
}

impl Eq for NamingConvention {}

/// Builds the `^<family>-RFC-<n>-<m>:` title pattern.
pub fn family_task_pattern(family: &str) -> Option<Regex> {
    Regex::new(&format!(r"^({}-RFC-\d+-\d+):", regex::escape(family))).ok()
}

/// Returns true if the title names an implementation concern.
pub fn title_has_keyword(title: &str) -> bool {
    let lowered = title.to_lowercase();
    IMPLEMENTATION_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Returns true if a section represents implementable work under the given convention.
pub fn is_implementable(section: &Section, convention: &NamingConvention) -> bool {
    match convention {
        NamingConvention::Family { task_title, .. } => task_title.is_match(&section.title),
        NamingConvention::Heuristic => {
            title_has_keyword(&section.title) || section.has_code_block()
        }
    }
}

/// Filters sections down to implementable units, preserving order.
pub fn classify<'a>(sections: &'a [Section], convention: &NamingConvention) -> Vec<&'a Section> {
    let kept: Vec<&Section> = sections
        .iter()
        .filter(|section| is_implementable(section, convention))
        .collect();

    tracing::debug!(
        total = sections.len(),
        kept = kept.len(),
        family = convention.is_family(),
        "classified sections"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::section::parse_structure;

    #[test]
    fn detects_family_identifiers() {
        match NamingConvention::detect("Game-RFC-004") {
            NamingConvention::Family { family, .. } => assert_eq!(family, "Game"),
            other => panic!("expected family convention, got {:?}", other),
        }
        assert!(NamingConvention::detect("Flow-RFC-1").is_family());
    }

    #[test]
    fn other_identifiers_are_heuristic() {
        assert_eq!(NamingConvention::detect("RFC-010"), NamingConvention::Heuristic);
        assert_eq!(NamingConvention::detect(""), NamingConvention::Heuristic);
        assert_eq!(
            NamingConvention::detect("Game-RFC-004-1"),
            NamingConvention::Heuristic
        );
        assert_eq!(NamingConvention::detect("design notes"), NamingConvention::Heuristic);
    }

    #[test]
    fn family_keeps_only_fully_qualified_titles() {
        let doc = "## Game-RFC-004-1: Model\n## Game-RFC-004: Overview\n## Notes\n```\ncode\n```\n## Game-RFC-004-2: System\n";
        let sections = parse_structure(doc);
        let convention = NamingConvention::detect("Game-RFC-004");
        let kept: Vec<&str> = classify(&sections, &convention)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(kept, vec!["Game-RFC-004-1: Model", "Game-RFC-004-2: System"]);
    }

    #[test]
    fn family_pattern_is_anchored_and_family_specific() {
        let convention = NamingConvention::detect("Game-RFC-004");
        let sections = parse_structure("## See Game-RFC-004-1: Model\n## Flow-RFC-004-1: Other\n");
        assert!(classify(&sections, &convention).is_empty());
    }

    #[test]
    fn task_id_extracts_prefix() {
        let convention = NamingConvention::detect("Game-RFC-004");
        assert_eq!(
            convention.task_id("Game-RFC-004-3: Add Rendering"),
            Some("Game-RFC-004-3")
        );
        assert_eq!(convention.task_id("Notes"), None);
        assert_eq!(NamingConvention::Heuristic.task_id("Game-RFC-004-3: X"), None);
    }

    #[test]
    fn heuristic_matches_title_keywords_case_insensitively() {
        assert!(title_has_keyword("Physics Integration"));
        assert!(title_has_keyword("The OBJECT MODEL"));
        assert!(title_has_keyword("Subclassing"));
        assert!(!title_has_keyword("Motivation"));
    }

    #[test]
    fn heuristic_keeps_code_block_sections_with_unrelated_titles() {
        let sections = parse_structure("## Motivation\nwhy\n## Example\n```\nlet x = 1;\n```\n");
        let kept = classify(&sections, &NamingConvention::Heuristic);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Example");
    }

    #[test]
    fn heuristic_keeps_a_section_once_when_both_triggers_fire() {
        let sections = parse_structure("## Render System\n```\ncode\n```\n");
        assert_eq!(classify(&sections, &NamingConvention::Heuristic).len(), 1);
    }

    #[test]
    fn implementation_keywords_table_is_fixed() {
        assert_eq!(IMPLEMENTATION_KEYWORDS.len(), 8);
        assert!(IMPLEMENTATION_KEYWORDS.contains(&"object model"));
        assert!(IMPLEMENTATION_KEYWORDS.contains(&"manager"));
    }
}
